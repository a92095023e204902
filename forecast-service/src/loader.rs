use std::{path::Path, sync::Arc, time::Duration};

use meter_client::domain::MeterReading;

use crate::{
    config::LoaderConfig,
    pipeline::{Pipeline, PipelineError},
    sinks::StoreSink,
    sources::ConsumptionCsvFileSource,
    store::ConsumptionStore,
    transform::ReadingValidation,
};

/// Load a delimited consumption file into `store`: parse, validate, batch-append.
///
/// Returns the number of records written. Stops at the first bad row.
pub async fn bulk_load<S>(
    store: Arc<S>,
    path: impl AsRef<Path>,
    delimiter: u8,
    cfg: &LoaderConfig,
) -> Result<u64, PipelineError>
where
    S: ConsumptionStore + 'static,
{
    let path = path.as_ref();
    let started = std::time::Instant::now();

    let pipeline: Pipeline<_, MeterReading, _> = Pipeline {
        source: ConsumptionCsvFileSource::new(path).with_delimiter(delimiter),
        transforms: vec![Arc::new(ReadingValidation)],
        sink: StoreSink::new(
            store,
            cfg.batch_size,
            cfg.max_retries,
            Duration::from_millis(cfg.retry_backoff_ms),
        ),
    };

    let loaded = pipeline.run().await?;
    tracing::info!(
        path = %path.display(),
        loaded,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "bulk load finished"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::io::Write;
    use time::macros::datetime;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn loads_file_into_store() {
        let file = write_file(
            "timestamp,meter_id,consumption_kwh,temperature_c,is_weekend\n\
             2024-01-01 00:00:00,METER_001,1.0,20.0,False\n\
             2024-01-01 00:30:00,METER_002,2.0,20.5,False\n\
             2024-01-01 01:00:00,METER_001,3.0,21.0,False\n",
        );
        let store = Arc::new(InMemoryStore::new());

        let loaded = bulk_load(store.clone(), file.path(), b',', &LoaderConfig::default())
            .await
            .unwrap();
        assert_eq!(loaded, 3);

        let hourly = store
            .aggregate_hourly(datetime!(2024-01-01 00:00:00 UTC), datetime!(2024-01-01 02:00:00 UTC))
            .await
            .unwrap();
        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].total_consumption, 3.0);
    }

    #[tokio::test]
    async fn malformed_row_fails_the_load() {
        let file = write_file(
            "timestamp,meter_id,consumption_kwh,temperature_c,is_weekend\n\
             2024-01-01 00:00:00,METER_001,abc,20.0,False\n",
        );
        let store = Arc::new(InMemoryStore::new());

        let err = bulk_load(store, file.path(), b',', &LoaderConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
