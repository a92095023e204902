use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use meter_client::domain::{timestamp::parse_timestamp, ConsumptionRecord, MeterReading};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Delimited flat-file source for consumption readings.
///
/// Expected header columns (by name, any order):
/// - timestamp (RFC3339 or naive `YYYY-MM-DD HH:MM:SS`, read as UTC)
/// - meter_id
/// - consumption_kwh
/// - temperature_c (may be empty)
/// - is_weekend (true/false, 1/0, yes/no)
///
/// Comma separated by default; pipe-delimited `.dat` exports work with
/// `with_delimiter(b'|')`.
pub struct ConsumptionCsvFileSource {
    path: PathBuf,
    delimiter: u8,
}

impl ConsumptionCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<MeterReading, String> {
    let get = |name: &str| -> Result<&str, String> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| format!("missing column '{name}'"))
    };

    let ts_str = get("timestamp")?;
    let timestamp = parse_timestamp(ts_str).map_err(|e| e.to_string())?;

    let meter_id = get("meter_id")?.trim().to_string();
    if meter_id.is_empty() {
        return Err("empty meter_id".to_string());
    }

    let kwh_str = get("consumption_kwh")?;
    let consumption_kwh: f64 = kwh_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid consumption_kwh '{kwh_str}': {e}"))?;

    let temp_str = get("temperature_c")?.trim();
    let temperature_c: Option<f64> = if temp_str.is_empty() {
        None
    } else {
        Some(
            temp_str
                .parse()
                .map_err(|e| format!("invalid temperature_c '{temp_str}': {e}"))?,
        )
    };

    let weekend_str = get("is_weekend")?;
    let is_weekend = parse_bool(weekend_str)
        .ok_or_else(|| format!("invalid is_weekend '{weekend_str}'"))?;

    let record = ConsumptionRecord::new(timestamp, consumption_kwh, temperature_c, is_weekend)
        .map_err(|e| e.to_string())?;

    Ok(MeterReading::new(meter_id, record))
}

#[async_trait::async_trait]
impl Source<MeterReading> for ConsumptionCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<MeterReading> {
        // Blocking reader inside a single task; the file is read once at startup.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let s = async_stream::try_stream! {
            let file = File::open(&path).map_err(|e| {
                PipelineError::Source(format!("failed to open {}: {e}", path.display()))
            })?;
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .trim(csv::Trim::Headers)
                .from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read headers: {e}")))?
                .clone();

            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read record: {e}"
                )))?;
                let line = record.position().map(|p| p.line());

                let reading = match record_to_reading(&record, &headers) {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("consumption_csv_parse_errors_total").increment(1);
                        let at = line.map(|l| format!(" at line {l}")).unwrap_or_default();
                        Err(PipelineError::Source(format!("{e}{at}")))?
                    }
                };

                yield Envelope::new(reading, line);
            }
        };

        Box::pin(s)
    }
}
