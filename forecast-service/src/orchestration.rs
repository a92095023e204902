use std::{sync::Arc, time::Instant};

use meter_client::domain::ForecastPoint;
use time::OffsetDateTime;

use crate::{
    forecasting::{ForecastEngine, ForecastError, ModelOrder},
    store::{ConsumptionStore, StoreError},
};

#[derive(thiserror::Error, Debug)]
pub enum ForecastDemandError {
    #[error("start_date must be before end_date")]
    InvalidWindow,
    #[error("No consumption data available for the requested date range")]
    NoData,
    #[error("forecast execution failed: {source}")]
    ExecutionFailed {
        #[source]
        source: ForecastError,
    },
    #[error("consumption store failed: {0}")]
    Store(#[from] StoreError),
}

impl From<ForecastError> for ForecastDemandError {
    fn from(source: ForecastError) -> Self {
        Self::ExecutionFailed { source }
    }
}

/// Aggregates history from the store and runs a fresh engine per call.
pub struct DemandForecaster<S> {
    store: Arc<S>,
    order: ModelOrder,
}

impl<S> Clone for DemandForecaster<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            order: self.order,
        }
    }
}

impl<S: ConsumptionStore> DemandForecaster<S> {
    pub fn new(store: Arc<S>, order: ModelOrder) -> Self {
        Self { store, order }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn forecast_demand(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        steps: usize,
    ) -> Result<Vec<ForecastPoint>, ForecastDemandError> {
        metrics::counter!("forecast_requests_total").increment(1);

        let result = self.run(start, end, steps).await;
        if let Err(e) = &result {
            let reason = match e {
                ForecastDemandError::InvalidWindow => "invalid_window",
                ForecastDemandError::NoData => "no_data",
                ForecastDemandError::ExecutionFailed { .. } => "execution",
                ForecastDemandError::Store(_) => "store",
            };
            metrics::counter!("forecast_failures_total", "reason" => reason).increment(1);
        }
        result
    }

    async fn run(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        steps: usize,
    ) -> Result<Vec<ForecastPoint>, ForecastDemandError> {
        if start >= end {
            return Err(ForecastDemandError::InvalidWindow);
        }

        let series = self.store.aggregate_hourly(start, end).await?;
        if series.is_empty() {
            return Err(ForecastDemandError::NoData);
        }

        let fit_started = Instant::now();
        let mut engine = ForecastEngine::new(self.order);
        engine.train(&series)?;
        metrics::histogram!("forecast_fit_duration_seconds").record(fit_started.elapsed().as_secs_f64());

        tracing::debug!(points = series.len(), order = %self.order, summary = %engine.summary(), "model fitted");

        let forecast = engine.predict(steps).inspect_err(|e| {
            tracing::error!(error = %e, "engine rejected predict after training");
        })?;

        tracing::info!(
            history_points = series.len(),
            steps,
            "demand forecast produced"
        );
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use meter_client::domain::ConsumptionRecord;
    use time::macros::datetime;

    async fn store_with(values: &[(OffsetDateTime, f64)]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (ts, kwh) in values {
            let record = ConsumptionRecord::new(*ts, *kwh, 20.0, false).unwrap();
            store.append(record, "METER_001").await.unwrap();
        }
        store
    }

    fn forecaster(store: Arc<InMemoryStore>) -> DemandForecaster<InMemoryStore> {
        DemandForecaster::new(store, ModelOrder::default())
    }

    #[tokio::test]
    async fn three_hours_of_history_forecast_two_steps() {
        let store = store_with(&[
            (datetime!(2024-01-01 00:00:00 UTC), 1.0),
            (datetime!(2024-01-01 01:00:00 UTC), 2.0),
            (datetime!(2024-01-01 02:00:00 UTC), 3.0),
        ])
        .await;

        let start = datetime!(2024-01-01 00:00:00 UTC);
        let end = datetime!(2024-01-01 23:00:00 UTC);

        let hourly = store.aggregate_hourly(start, end).await.unwrap();
        let totals: Vec<_> = hourly.iter().map(|p| p.total_consumption).collect();
        assert_eq!(totals, vec![1.0, 2.0, 3.0]);

        let out = forecaster(store).forecast_demand(start, end, 2).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, datetime!(2024-01-01 03:00:00 UTC));
        assert_eq!(out[1].timestamp, datetime!(2024-01-01 04:00:00 UTC));
        // Too short for AR terms; the random walk keeps its drift.
        approx::assert_relative_eq!(out[0].predicted_consumption_kwh, 4.0, epsilon = 1e-9);
        approx::assert_relative_eq!(out[1].predicted_consumption_kwh, 5.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn inverted_or_empty_window_is_rejected() {
        let f = forecaster(Arc::new(InMemoryStore::new()));
        let t = datetime!(2024-01-01 00:00:00 UTC);

        assert!(matches!(f.forecast_demand(t, t, 1).await, Err(ForecastDemandError::InvalidWindow)));
        assert!(matches!(
            f.forecast_demand(t + time::Duration::hours(1), t, 1).await,
            Err(ForecastDemandError::InvalidWindow)
        ));
    }

    #[tokio::test]
    async fn empty_store_is_no_data() {
        let f = forecaster(Arc::new(InMemoryStore::new()));
        let err = f
            .forecast_demand(datetime!(2024-01-01 00:00:00 UTC), datetime!(2024-01-31 00:00:00 UTC), 24)
            .await
            .unwrap_err();
        assert!(matches!(err, ForecastDemandError::NoData));
    }

    #[tokio::test]
    async fn single_hour_of_history_is_an_execution_failure() {
        let store = store_with(&[(datetime!(2024-01-01 05:00:00 UTC), 1.0)]).await;
        let err = forecaster(store)
            .forecast_demand(datetime!(2024-01-01 00:00:00 UTC), datetime!(2024-01-02 00:00:00 UTC), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, ForecastDemandError::ExecutionFailed { .. }));
        assert!(err.to_string().starts_with("forecast execution failed"));
    }
}
