//! ratatui widgets for the forecast dashboard.

use meter_client::domain::ForecastPoint;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap},
};
use time::{macros::format_description, OffsetDateTime};

const STATUS_HEIGHT: u16 = 3;
const CHART_HEIGHT: u16 = 16;
const PEAK_HEIGHT: u16 = 10;

pub fn short_time(ts: OffsetDateTime) -> String {
    ts.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| ts.to_string())
}

/// Highest predicted hour; the earliest one wins a tie.
pub fn peak_demand(points: &[ForecastPoint]) -> Option<&ForecastPoint> {
    points.iter().fold(None, |best: Option<&ForecastPoint>, p| match best {
        Some(b) if b.predicted_consumption_kwh >= p.predicted_consumption_kwh => Some(b),
        _ => Some(p),
    })
}

pub fn recommendation(peak: &ForecastPoint) -> String {
    let when = peak
        .timestamp
        .format(format_description!("[day]/[month]/[year] at [hour]:[minute]"))
        .unwrap_or_else(|_| peak.timestamp.to_string());
    format!(
        "Optimisation recommendation:\n\
         Peak demand of {:.2} kWh is expected on {when}.\n\
         - Transformer allocation: check transformer capacity in the affected area and plan \
         preventive reinforcement or load transfer to avoid overload.\n\
         - Distributed generation: schedule batteries or small generators to inject energy \
         into the grid and relieve demand at the peak hour.",
        peak.predicted_consumption_kwh
    )
}

/// `(hours ahead, kWh)` pairs for the chart dataset.
pub fn chart_points(points: &[ForecastPoint]) -> Vec<(f64, f64)> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| ((i + 1) as f64, p.predicted_consumption_kwh))
        .collect()
}

fn value_bounds(data: &[(f64, f64)]) -> [f64; 2] {
    let min = data.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let max = data.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    let pad = ((max - min) * 0.05).max(0.5);
    [min - pad, max + pad]
}

pub fn forecast_chart<'a>(data: &'a [(f64, f64)], points: &[ForecastPoint]) -> Chart<'a> {
    let [y_min, y_max] = value_bounds(data);
    let x_max = (data.len() as f64).max(2.0);
    let first = points.first().map(|p| short_time(p.timestamp)).unwrap_or_default();
    let last = points.last().map(|p| short_time(p.timestamp)).unwrap_or_default();

    let dataset = Dataset::default()
        .name("Forecast")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(data);

    Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(" Load forecast "))
        .x_axis(
            Axis::default()
                .title("Hour")
                .style(Style::default().fg(Color::Gray))
                .bounds([1.0, x_max])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .title("kWh")
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.1}")),
                    Span::raw(format!("{:.1}", (y_min + y_max) / 2.0)),
                    Span::raw(format!("{y_max:.1}")),
                ]),
        )
}

pub fn forecast_table(points: &[ForecastPoint]) -> Table<'static> {
    let rows: Vec<Row> = points
        .iter()
        .map(|p| {
            Row::new(vec![
                short_time(p.timestamp),
                format!("{:.2}", p.predicted_consumption_kwh),
            ])
        })
        .collect();

    Table::new(rows, [Constraint::Length(18), Constraint::Length(26)])
        .header(
            Row::new(vec!["timestamp", "predicted_consumption_kwh"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(" Raw forecast data "))
}

pub fn peak_panel(points: &[ForecastPoint]) -> Paragraph<'static> {
    let text = match peak_demand(points) {
        Some(peak) => format!(
            "Peak predicted demand: {:.2} kWh at {}\n\n{}",
            peak.predicted_consumption_kwh,
            short_time(peak.timestamp),
            recommendation(peak)
        ),
        None => "No forecast points returned.".to_string(),
    };

    Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Peak demand "))
}

/// Rows needed to show every panel without clipping the table.
pub fn viewport_height(points: &[ForecastPoint]) -> u16 {
    let table = u16::try_from(points.len()).unwrap_or(u16::MAX).saturating_add(3);
    (STATUS_HEIGHT + CHART_HEIGHT + PEAK_HEIGHT).saturating_add(table)
}

pub fn draw(frame: &mut Frame, status: &str, points: &[ForecastPoint]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(CHART_HEIGHT),
            Constraint::Length(PEAK_HEIGHT),
            Constraint::Min(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(status.to_string())
        .style(Style::default().fg(Color::White))
        .block(Block::default().borders(Borders::ALL).title(" Energy demand forecast "));
    frame.render_widget(header, chunks[0]);

    let data = chart_points(points);
    frame.render_widget(forecast_chart(&data, points), chunks[1]);
    frame.render_widget(peak_panel(points), chunks[2]);
    frame.render_widget(forecast_table(points), chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use time::macros::datetime;

    fn point(hour: u8, kwh: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: datetime!(2024-07-15 00:00:00 UTC) + time::Duration::hours(i64::from(hour)),
            predicted_consumption_kwh: kwh,
        }
    }

    fn screen(points: &[ForecastPoint]) -> String {
        let backend = TestBackend::new(100, viewport_height(points));
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| draw(frame, "Service status: online", points)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(usize::from(buffer.area.width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn peak_prefers_the_earliest_maximum() {
        let points = vec![point(0, 1.0), point(1, 5.0), point(2, 5.0), point(3, 2.0)];
        let peak = peak_demand(&points).unwrap();
        assert_eq!(peak.timestamp, datetime!(2024-07-15 01:00:00 UTC));
        assert!(peak_demand(&[]).is_none());
    }

    #[test]
    fn chart_points_count_hours_ahead() {
        let data = chart_points(&[point(0, 5.0), point(1, 10.0)]);
        assert_eq!(data, vec![(1.0, 5.0), (2.0, 10.0)]);
    }

    #[test]
    fn flat_forecast_still_gets_a_value_range() {
        let [lo, hi] = value_bounds(&[(1.0, 3.0), (2.0, 3.0)]);
        assert!(lo < 3.0 && hi > 3.0);
        assert_eq!(value_bounds(&[]), [0.0, 1.0]);
    }

    #[test]
    fn recommendation_names_value_and_time() {
        let text = recommendation(&point(14, 123.456));
        assert!(text.contains("123.46 kWh"));
        assert!(text.contains("15/07/2024 at 14:00"));
    }

    #[test]
    fn viewport_grows_with_the_table() {
        assert_eq!(viewport_height(&[]) + 2, viewport_height(&[point(0, 1.0), point(1, 2.0)]));
    }

    #[test]
    fn dashboard_shows_every_panel() {
        let text = screen(&[point(0, 5.0), point(1, 10.0), point(2, 7.25)]);
        assert!(text.contains("Service status: online"));
        assert!(text.contains("Load forecast"));
        assert!(text.contains("Peak predicted demand: 10.00 kWh at 2024-07-15 01:00"));
        assert!(text.contains("Raw forecast data"));
        assert!(text.contains("predicted_consumption_kwh"));
        assert!(text.contains("2024-07-15 02:00"));
        assert!(text.contains("7.25"));
    }

    #[test]
    fn empty_forecast_renders_a_placeholder() {
        let text = screen(&[]);
        assert!(text.contains("No forecast points returned."));
    }
}
