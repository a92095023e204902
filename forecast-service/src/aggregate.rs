//! Hourly demand aggregation over raw per-meter readings.

use std::collections::BTreeMap;

use meter_client::domain::{round_kwh, truncate_to_hour, ConsumptionRecord, HourlyDemandPoint};
use time::{OffsetDateTime, UtcOffset};

/// Inclusive on both ends.
pub fn in_window(ts: OffsetDateTime, start: OffsetDateTime, end: OffsetDateTime) -> bool {
    start <= ts && ts <= end
}

/// Sum consumption per UTC hour for records inside `[start, end]`.
///
/// Output is ascending with one point per hour that has at least one record;
/// empty hours are not filled in. Totals are rounded to 2 decimals after summing.
pub fn aggregate_hourly<'a, I>(records: I, start: OffsetDateTime, end: OffsetDateTime) -> Vec<HourlyDemandPoint>
where
    I: IntoIterator<Item = &'a ConsumptionRecord>,
{
    let mut buckets: BTreeMap<OffsetDateTime, f64> = BTreeMap::new();

    for r in records {
        if !in_window(r.timestamp(), start, end) {
            continue;
        }
        let hour = truncate_to_hour(r.timestamp().to_offset(UtcOffset::UTC));
        *buckets.entry(hour).or_insert(0.0) += r.consumption_kwh();
    }

    finish_buckets(buckets)
}

/// Round already-summed hourly totals into demand points, keeping order.
pub fn finish_buckets<I>(totals: I) -> Vec<HourlyDemandPoint>
where
    I: IntoIterator<Item = (OffsetDateTime, f64)>,
{
    totals
        .into_iter()
        .map(|(timestamp, total)| HourlyDemandPoint {
            timestamp,
            total_consumption: round_kwh(total),
        })
        .collect()
}
