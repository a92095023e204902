use std::collections::{BTreeMap, BTreeSet};

use meter_client::domain::{ConsumptionRecord, HourlyDemandPoint, Meter, MeterReading};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{ConsumptionStore, StoreError};
use crate::aggregate::{aggregate_hourly, in_window};

/// Records held per meter in process memory, usually bulk-loaded from a flat
/// file before the HTTP listener starts.
#[derive(Default)]
pub struct InMemoryStore {
    meters: RwLock<BTreeMap<String, Meter>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn total_records(&self) -> usize {
        self.meters.read().await.values().map(Meter::total_records).sum()
    }

    fn insert(meters: &mut BTreeMap<String, Meter>, record: ConsumptionRecord, meter_id: &str) -> Result<(), StoreError> {
        if let Some(meter) = meters.get_mut(meter_id) {
            meter.add_record(record);
            return Ok(());
        }

        let mut meter = Meter::new(meter_id)?;
        meter.add_record(record);
        meters.insert(meter_id.to_string(), meter);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConsumptionStore for InMemoryStore {
    async fn list_meter_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.meters.read().await.keys().cloned().collect())
    }

    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        meter_id: Option<&str>,
    ) -> Result<Vec<ConsumptionRecord>, StoreError> {
        let meters = self.meters.read().await;

        let mut out: Vec<ConsumptionRecord> = meters
            .iter()
            .filter(|(id, _)| meter_id.map_or(true, |wanted| wanted == id.as_str()))
            .flat_map(|(_, meter)| meter.records().iter().copied())
            .filter(|r| in_window(r.timestamp(), start, end))
            .collect();

        out.sort_by_key(|r| r.timestamp());
        Ok(out)
    }

    async fn append(&self, record: ConsumptionRecord, meter_id: &str) -> Result<(), StoreError> {
        let mut meters = self.meters.write().await;
        Self::insert(&mut meters, record, meter_id)
    }

    async fn append_batch(&self, readings: &[MeterReading]) -> Result<u64, StoreError> {
        let mut meters = self.meters.write().await;
        for reading in readings {
            Self::insert(&mut meters, reading.record, &reading.meter_id)?;
        }
        Ok(readings.len() as u64)
    }

    async fn aggregate_hourly(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<HourlyDemandPoint>, StoreError> {
        let meters = self.meters.read().await;
        let all = meters.values().flat_map(|m| m.records().iter());
        Ok(aggregate_hourly(all, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::domain::DomainError;
    use time::macros::datetime;

    fn rec(ts: OffsetDateTime, kwh: f64) -> ConsumptionRecord {
        ConsumptionRecord::new(ts, kwh, 20.0, false).unwrap()
    }

    #[tokio::test]
    async fn empty_store_answers_with_empty_results() {
        let store = InMemoryStore::new();
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let end = datetime!(2024-12-31 00:00:00 UTC);

        assert!(store.list_meter_ids().await.unwrap().is_empty());
        assert!(store.query_range(start, end, None).await.unwrap().is_empty());
        assert!(store.aggregate_hourly(start, end).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_registers_meters_and_keeps_duplicates() {
        let store = InMemoryStore::new();
        let r = rec(datetime!(2024-01-01 00:00:00 UTC), 1.0);

        store.append(r, "METER_002").await.unwrap();
        store.append(r, "METER_001").await.unwrap();
        store.append(r, "METER_001").await.unwrap();

        let ids: Vec<_> = store.list_meter_ids().await.unwrap().into_iter().collect();
        assert_eq!(ids, vec!["METER_001", "METER_002"]);
        assert_eq!(store.total_records().await, 3);

        let hourly = store
            .aggregate_hourly(datetime!(2024-01-01 00:00:00 UTC), datetime!(2024-01-01 01:00:00 UTC))
            .await
            .unwrap();
        assert_eq!(hourly[0].total_consumption, 3.0);
    }

    #[tokio::test]
    async fn append_rejects_empty_meter_id() {
        let store = InMemoryStore::new();
        let r = rec(datetime!(2024-01-01 00:00:00 UTC), 1.0);
        let err = store.append(r, "").await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::EmptyMeterId)));
    }

    #[tokio::test]
    async fn query_range_is_inclusive_sorted_and_honours_meter_filter() {
        let store = InMemoryStore::new();
        let readings = vec![
            MeterReading::new("B", rec(datetime!(2024-01-01 02:00:00 UTC), 2.0)),
            MeterReading::new("A", rec(datetime!(2024-01-01 01:00:00 UTC), 1.0)),
            MeterReading::new("A", rec(datetime!(2024-01-01 03:00:00 UTC), 3.0)),
            MeterReading::new("B", rec(datetime!(2024-01-01 04:00:00 UTC), 4.0)),
        ];
        assert_eq!(store.append_batch(&readings).await.unwrap(), 4);

        let start = datetime!(2024-01-01 01:00:00 UTC);
        let end = datetime!(2024-01-01 03:00:00 UTC);

        let all = store.query_range(start, end, None).await.unwrap();
        let kwh: Vec<_> = all.iter().map(|r| r.consumption_kwh()).collect();
        assert_eq!(kwh, vec![1.0, 2.0, 3.0]);

        let only_b = store.query_range(start, end, Some("B")).await.unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].consumption_kwh(), 2.0);

        let unknown = store.query_range(start, end, Some("Z")).await.unwrap();
        assert!(unknown.is_empty());
    }
}
