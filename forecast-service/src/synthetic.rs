//! Synthetic smart-meter readings for demos and load tests.

use std::{f64::consts::PI, io::Write};

use anyhow::Result;
use meter_client::domain::{round_kwh, ConsumptionRecord, MeterReading};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use time::{macros::datetime, macros::format_description, Date, Duration, OffsetDateTime, Time};

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub meters: u32,
    pub start: Date,
    /// Inclusive; the last reading is at midnight of this day.
    pub end: Date,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            meters: 10,
            start: time::macros::date!(2024 - 01 - 01),
            end: time::macros::date!(2024 - 10 - 27),
            seed: None,
        }
    }
}

const HEAT_WAVE_START: OffsetDateTime = datetime!(2024-07-15 14:00:00 UTC);
const HEAT_WAVE_END: OffsetDateTime = datetime!(2024-07-16 18:00:00 UTC);

fn annual_phase(ts: OffsetDateTime) -> f64 {
    (f64::from(ts.ordinal()) * 2.0 * PI / 365.0).sin()
}

pub fn meter_id(index: u32) -> String {
    format!("METER_{index:03}")
}

/// Hourly readings for every meter, meter by meter in time order.
///
/// Daily sine profile times annual seasonality plus noise, scaled per meter and
/// floored at zero. `METER_001` gets a +50% heat wave in mid July 2024.
pub fn generate(cfg: &SyntheticConfig) -> Result<Vec<MeterReading>> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let consumption_noise = Normal::new(0.0, 0.2)?;
    let temperature_noise = Normal::new(0.0, 2.0)?;

    let start = cfg.start.with_time(Time::MIDNIGHT).assume_utc();
    let end = cfg.end.with_time(Time::MIDNIGHT).assume_utc();
    if end < start {
        anyhow::bail!("end date {} is before start date {}", cfg.end, cfg.start);
    }
    let hours = (end - start).whole_hours() + 1;

    let mut out = Vec::with_capacity(hours as usize * cfg.meters as usize);
    for index in 1..=cfg.meters {
        let id = meter_id(index);
        let scale = rng.gen_range(5.0..15.0);

        for h in 0..hours {
            let ts = start + Duration::hours(h);
            let base = (f64::from(ts.hour()) * 2.0 * PI / 24.0).sin() * 0.5 + 1.5;
            let seasonal = annual_phase(ts) * 0.3 + 1.0;

            let mut kwh = ((base * seasonal + consumption_noise.sample(&mut rng)) * scale).max(0.0);
            if index == 1 && ts >= HEAT_WAVE_START && ts <= HEAT_WAVE_END {
                kwh *= 1.5;
            }

            let temperature = annual_phase(ts) * 10.0 + 25.0 + temperature_noise.sample(&mut rng);
            let temperature = (temperature * 10.0).round() / 10.0;
            let is_weekend = ts.weekday().number_days_from_monday() >= 5;

            let record = ConsumptionRecord::new(ts, round_kwh(kwh), temperature, is_weekend)?;
            out.push(MeterReading::new(id.clone(), record));
        }
    }

    Ok(out)
}

#[derive(serde::Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    meter_id: &'a str,
    consumption_kwh: f64,
    temperature_c: Option<f64>,
    is_weekend: &'static str,
}

/// Write readings with the header the bulk loader expects.
pub fn write_csv<W: Write>(readings: &[MeterReading], writer: W) -> Result<u64> {
    let mut wtr = csv::Writer::from_writer(writer);
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    for r in readings {
        wtr.serialize(CsvRow {
            timestamp: r.record.timestamp().format(fmt)?,
            meter_id: &r.meter_id,
            consumption_kwh: r.record.consumption_kwh(),
            temperature_c: r.record.temperature_c(),
            is_weekend: if r.record.is_weekend() { "True" } else { "False" },
        })?;
    }
    wtr.flush()?;

    Ok(readings.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pipeline::Source, sources::ConsumptionCsvFileSource};
    use futures::StreamExt;
    use time::macros::date;

    fn small(seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            meters: 2,
            start: date!(2024 - 07 - 15),
            end: date!(2024 - 07 - 17),
            seed: Some(seed),
        }
    }

    #[test]
    fn covers_every_hour_for_every_meter() {
        let readings = generate(&small(7)).unwrap();
        // Two days of hours plus the closing midnight.
        assert_eq!(readings.len(), 2 * 49);
        assert_eq!(readings[0].meter_id, "METER_001");
        assert_eq!(readings[49].meter_id, "METER_002");
        assert_eq!(readings[48].record.timestamp(), datetime!(2024-07-17 00:00:00 UTC));
        assert!(readings.iter().all(|r| r.record.consumption_kwh() >= 0.0));
    }

    #[test]
    fn seed_makes_output_reproducible() {
        let a = generate(&small(42)).unwrap();
        let b = generate(&small(42)).unwrap();
        let kwh = |v: &[MeterReading]| v.iter().map(|r| r.record.consumption_kwh()).collect::<Vec<_>>();
        assert_eq!(kwh(&a), kwh(&b));
    }

    #[test]
    fn weekend_flag_follows_the_calendar() {
        // 2024-07-20 is a Saturday.
        let cfg = SyntheticConfig {
            meters: 1,
            start: date!(2024 - 07 - 19),
            end: date!(2024 - 07 - 20),
            seed: Some(1),
        };
        let readings = generate(&cfg).unwrap();
        assert!(!readings[0].record.is_weekend());
        assert!(readings.last().unwrap().record.is_weekend());
    }

    #[test]
    fn inverted_dates_are_rejected() {
        let cfg = SyntheticConfig {
            start: date!(2024 - 02 - 01),
            end: date!(2024 - 01 - 01),
            ..SyntheticConfig::default()
        };
        assert!(generate(&cfg).is_err());
    }

    #[tokio::test]
    async fn written_file_is_readable_by_the_loader() {
        let readings = generate(&small(3)).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(&readings, file.reopen().unwrap()).unwrap();

        let parsed: Vec<_> = ConsumptionCsvFileSource::new(file.path()).stream().await.collect().await;
        assert_eq!(parsed.len(), readings.len());
        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.payload.meter_id, "METER_001");
        assert_eq!(first.payload.record.timestamp(), readings[0].record.timestamp());
    }
}
