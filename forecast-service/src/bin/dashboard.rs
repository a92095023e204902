use anyhow::{anyhow, Context, Result};
use forecast_service::{
    dashboard::{
        render, validate_steps, ClientError, DashboardWindow, ForecastClient, DEFAULT_STEPS, HISTORY_DAYS,
    },
    observability,
};
use meter_client::domain::timestamp::parse_timestamp;
use ratatui::{backend::CrosstermBackend, Terminal, TerminalOptions, Viewport};
use std::{env, io};
use time::{Duration, OffsetDateTime};

const USAGE: &str = "usage: dashboard [steps 1..=72] [start] [end]   (FORECAST_API_URL, default http://localhost:8000)";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    let steps = match args.get(1) {
        Some(s) => s.parse().with_context(|| format!("invalid steps {s:?}\n{USAGE}"))?,
        None => DEFAULT_STEPS,
    };
    let steps = validate_steps(steps).map_err(|e| anyhow!("{e}\n{USAGE}"))?;

    let default = DashboardWindow::ending_before(OffsetDateTime::now_utc());
    let end = match args.get(3) {
        Some(s) => parse_timestamp(s)?,
        None => default.end,
    };
    let start = match args.get(2) {
        Some(s) => parse_timestamp(s)?,
        None => end - Duration::days(HISTORY_DAYS),
    };
    let window = DashboardWindow { start, end };

    let base_url = env::var("FORECAST_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let client = ForecastClient::new(base_url)?;

    if !client.health().await {
        println!("Service status: OFFLINE ({})", client.base_url());
        println!("The forecast service must be online to produce a forecast. Please start the server.");
        return Ok(());
    }
    tracing::info!(
        start = %render::short_time(window.start),
        end = %render::short_time(window.end),
        steps,
        "requesting forecast"
    );

    let points = match client.forecast(window.start, window.end, steps).await {
        Ok(points) => points,
        Err(e @ ClientError::Connectivity(_)) => {
            println!("{e}");
            return Ok(());
        }
        Err(e) => {
            println!("Could not produce a forecast: {e}");
            println!("Check the service status and the request parameters.");
            return Ok(());
        }
    };

    let status = format!(
        "Service status: online ({})   history {} to {}   next {steps} hours",
        client.base_url(),
        render::short_time(window.start),
        render::short_time(window.end)
    );
    let mut terminal = Terminal::with_options(
        CrosstermBackend::new(io::stdout()),
        TerminalOptions {
            viewport: Viewport::Inline(render::viewport_height(&points)),
        },
    )?;
    terminal.draw(|frame| render::draw(frame, &status, &points))?;
    println!();

    Ok(())
}
