use crate::pipeline::{Envelope, PipelineError, Transform};
use meter_client::domain::MeterReading;
use time::macros::datetime;

/// Pure validation of a `MeterReading`.
///
/// Rules:
/// - timestamp must be within a broad sanity window [2000-01-01, 2100-01-01].
///
/// Non-negative consumption and a finite or absent temperature are already
/// guaranteed by `ConsumptionRecord`.
pub fn validate_reading(env: Envelope<MeterReading>) -> Result<Envelope<MeterReading>, PipelineError> {
    let r = &env.payload.record;
    let at = env.line.map(|l| format!(" at line {l}")).unwrap_or_default();

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.timestamp() < min_ts || r.timestamp() > max_ts {
        return Err(PipelineError::Transform(format!("timestamp out of allowed range{at}")));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<MeterReading, MeterReading> for ReadingValidation {
    async fn apply(&self, input: Envelope<MeterReading>) -> Result<Envelope<MeterReading>, PipelineError> {
        validate_reading(input).inspect_err(|_| {
            metrics::counter!("validation_reading_rejected_total").increment(1);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::domain::ConsumptionRecord;
    use time::OffsetDateTime;

    fn reading(ts: OffsetDateTime, temperature_c: Option<f64>) -> Envelope<MeterReading> {
        let record = ConsumptionRecord::new(ts, 1.0, temperature_c, false).unwrap();
        Envelope::new(MeterReading::new("METER_001", record), Some(7))
    }

    #[test]
    fn accepts_valid_reading() {
        let env = reading(datetime!(2024-01-01 00:00:00 UTC), Some(21.0));
        assert!(validate_reading(env).is_ok());
    }

    #[test]
    fn rejects_out_of_range_ts() {
        let env = reading(datetime!(1800-01-01 00:00:00 UTC), Some(21.0));
        let res = validate_reading(env);
        assert!(matches!(res, Err(PipelineError::Transform(ref m)) if m.contains("line 7")));
    }

    #[test]
    fn accepts_missing_temperature() {
        let env = reading(datetime!(2024-01-01 00:00:00 UTC), None);
        assert!(validate_reading(env).is_ok());
    }
}
