use time::{Duration, OffsetDateTime};

/// Total consumption across all meters for one clock hour.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HourlyDemandPoint {
    #[cfg_attr(feature = "serde", serde(with = "crate::domain::timestamp::lenient"))]
    pub timestamp: OffsetDateTime,
    pub total_consumption: f64,
}

/// One projected hour. Predictions are not clamped and may be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForecastPoint {
    #[cfg_attr(feature = "serde", serde(with = "crate::domain::timestamp::lenient"))]
    pub timestamp: OffsetDateTime,
    pub predicted_consumption_kwh: f64,
}

/// Drop minutes, seconds and sub-seconds, keeping the offset.
pub fn truncate_to_hour(ts: OffsetDateTime) -> OffsetDateTime {
    ts - Duration::minutes(i64::from(ts.minute()))
        - Duration::seconds(i64::from(ts.second()))
        - Duration::nanoseconds(i64::from(ts.nanosecond()))
}

/// Round to two decimals (half away from zero).
pub fn round_kwh(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
