use anyhow::{bail, Context, Result};
use forecast_service::{config::AppConfig, loader, observability, store::PostgresStore};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: backfill_consumption <csv_file_path>");
    }
    let file_path = &args[1];

    // FORECAST_CONFIG can point at a backfill-specific file.
    let cfg = AppConfig::load()?;
    let pg = cfg
        .postgres
        .as_ref()
        .context("backfill requires a [postgres] section")?;

    let store = Arc::new(PostgresStore::connect(pg).await?);
    let delimiter = u8::try_from(cfg.store.csv_delimiter).context("store.csv_delimiter must be ASCII")?;

    let loaded = loader::bulk_load(store, file_path, delimiter, &cfg.loader).await?;
    println!("loaded {loaded} consumption records from {file_path}");

    Ok(())
}
