use anyhow::{Context, Result};
use forecast_service::{
    api::{self, ApiState},
    config::{AppConfig, StoreKind},
    loader, metrics_server, observability,
    orchestration::DemandForecaster,
    store::{ConfiguredStore, InMemoryStore, PostgresStore},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let store = match cfg.store.kind {
        StoreKind::Memory => ConfiguredStore::InMemory(InMemoryStore::new()),
        StoreKind::Postgres => {
            let pg = cfg
                .postgres
                .as_ref()
                .context("store.kind = \"postgres\" requires a [postgres] section")?;
            ConfiguredStore::Postgres(PostgresStore::connect(pg).await?)
        }
    };
    let store = Arc::new(store);
    tracing::info!(kind = store.kind(), "consumption store selected");

    // Bulk load before accepting requests
    if let Some(path) = &cfg.store.csv_path {
        let delimiter = u8::try_from(cfg.store.csv_delimiter).context("store.csv_delimiter must be ASCII")?;
        loader::bulk_load(store.clone(), path, delimiter, &cfg.loader)
            .await
            .with_context(|| format!("failed to load consumption data from {path}"))?;
    }

    let forecaster = DemandForecaster::new(store, cfg.model.order());
    let app = api::router(ApiState {
        forecaster,
        service_name: Arc::from(cfg.server.service_name.as_str()),
        max_steps: cfg.server.max_steps,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind_addr))?;
    tracing::info!(
        addr = %cfg.server.bind_addr,
        order = %cfg.model.order(),
        "forecast service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
