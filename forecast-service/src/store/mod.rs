//! Consumption storage behind one async contract, with an in-memory and a
//! Postgres realization picked from configuration at startup.

use std::collections::BTreeSet;

use meter_client::domain::{ConsumptionRecord, DomainError, HourlyDemandPoint, MeterReading};
use time::OffsetDateTime;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("database error: {0}")]
    Database(String),
}

#[async_trait::async_trait]
pub trait ConsumptionStore: Send + Sync {
    /// Every distinct meter id seen so far.
    async fn list_meter_ids(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Records with `start <= timestamp <= end`, ascending by timestamp.
    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        meter_id: Option<&str>,
    ) -> Result<Vec<ConsumptionRecord>, StoreError>;

    /// Add one record; duplicates are kept.
    async fn append(&self, record: ConsumptionRecord, meter_id: &str) -> Result<(), StoreError>;

    async fn append_batch(&self, readings: &[MeterReading]) -> Result<u64, StoreError> {
        for reading in readings {
            self.append(reading.record, &reading.meter_id).await?;
        }
        Ok(readings.len() as u64)
    }

    /// Total consumption per hour inside `[start, end]`, see [`crate::aggregate`].
    async fn aggregate_hourly(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<HourlyDemandPoint>, StoreError>;
}

/// The store selected by `[store].kind`.
pub enum ConfiguredStore {
    InMemory(InMemoryStore),
    Postgres(PostgresStore),
}

impl ConfiguredStore {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for ConfiguredStore {
    async fn list_meter_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        match self {
            Self::InMemory(s) => s.list_meter_ids().await,
            Self::Postgres(s) => s.list_meter_ids().await,
        }
    }

    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        meter_id: Option<&str>,
    ) -> Result<Vec<ConsumptionRecord>, StoreError> {
        match self {
            Self::InMemory(s) => s.query_range(start, end, meter_id).await,
            Self::Postgres(s) => s.query_range(start, end, meter_id).await,
        }
    }

    async fn append(&self, record: ConsumptionRecord, meter_id: &str) -> Result<(), StoreError> {
        match self {
            Self::InMemory(s) => s.append(record, meter_id).await,
            Self::Postgres(s) => s.append(record, meter_id).await,
        }
    }

    async fn append_batch(&self, readings: &[MeterReading]) -> Result<u64, StoreError> {
        match self {
            Self::InMemory(s) => s.append_batch(readings).await,
            Self::Postgres(s) => s.append_batch(readings).await,
        }
    }

    async fn aggregate_hourly(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<HourlyDemandPoint>, StoreError> {
        match self {
            Self::InMemory(s) => s.aggregate_hourly(start, end).await,
            Self::Postgres(s) => s.aggregate_hourly(start, end).await,
        }
    }
}
