use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use meter_client::domain::MeterReading;

use crate::{
    pipeline::{Envelope, PipelineError, Sink},
    store::{ConsumptionStore, StoreError},
};

/// Batches validated readings into a [`ConsumptionStore`].
///
/// The first upstream error stops the load; everything flushed before it
/// stays in the store.
pub struct StoreSink<S> {
    store: Arc<S>,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<S: ConsumptionStore> StoreSink<S> {
    pub fn new(store: Arc<S>, batch_size: usize, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, batch: &[MeterReading]) -> Result<u64, PipelineError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut attempt: u32 = 0;
        loop {
            match self.store.append_batch(batch).await {
                Ok(written) => {
                    metrics::counter!("store_records_loaded_total").increment(written);
                    return Ok(written);
                }
                // Invalid data will not get better on retry.
                Err(e @ StoreError::Domain(_)) => {
                    metrics::counter!("store_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        "store sink flush failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "store sink flush failed, giving up");
                    metrics::counter!("store_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: ConsumptionStore + 'static> Sink<MeterReading> for StoreSink<S> {
    async fn run<I>(&self, mut input: I) -> Result<u64, PipelineError>
    where
        I: futures::Stream<Item = Result<Envelope<MeterReading>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut buffer: Vec<MeterReading> = Vec::with_capacity(self.batch_size);
        let mut written = 0;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, loaded = written, "aborting load on upstream error");
                    return Err(e);
                }
            };

            buffer.push(env.payload);
            if buffer.len() >= self.batch_size {
                written += self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        written += self.flush_batch(&buffer).await?;
        Ok(written)
    }
}
