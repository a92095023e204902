use std::collections::BTreeSet;

use meter_client::{
    db::consumption_queries,
    domain::{ConsumptionRecord, HourlyDemandPoint, Meter, MeterReading},
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use time::OffsetDateTime;

use super::{ConsumptionStore, StoreError};
use crate::{aggregate::finish_buckets, config::PostgresConfig};

fn db_err(e: anyhow::Error) -> StoreError {
    StoreError::Database(format!("{e:#}"))
}

/// `consumption_records` table in Postgres. Hourly aggregation is pushed down
/// to SQL; rounding happens here so both stores round identically.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and create the table if it is missing.
    pub async fn connect(cfg: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.uri)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        consumption_queries::ensure_schema(&pool).await.map_err(db_err)?;
        tracing::info!(max_connections = cfg.max_connections, "postgres consumption store ready");

        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for PostgresStore {
    async fn list_meter_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        let ids = consumption_queries::distinct_meter_ids(&self.pool).await.map_err(db_err)?;
        Ok(ids.into_iter().collect())
    }

    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        meter_id: Option<&str>,
    ) -> Result<Vec<ConsumptionRecord>, StoreError> {
        let rows = consumption_queries::consumption_range(&self.pool, start, end, meter_id)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|row| ConsumptionRecord::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn append(&self, record: ConsumptionRecord, meter_id: &str) -> Result<(), StoreError> {
        // Same meter-id rule as the in-memory store.
        Meter::new(meter_id)?;
        let reading = MeterReading::new(meter_id, record);
        consumption_queries::insert_readings(&self.pool, std::slice::from_ref(&reading))
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn append_batch(&self, readings: &[MeterReading]) -> Result<u64, StoreError> {
        for reading in readings {
            Meter::new(reading.meter_id.as_str())?;
        }
        consumption_queries::insert_readings(&self.pool, readings)
            .await
            .map_err(db_err)
    }

    async fn aggregate_hourly(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<HourlyDemandPoint>, StoreError> {
        let rows = consumption_queries::hourly_totals(&self.pool, start, end)
            .await
            .map_err(db_err)?;

        Ok(finish_buckets(rows.into_iter().map(|r| (r.hour, r.total_consumption))))
    }
}
