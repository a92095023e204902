use time::OffsetDateTime;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("consumption cannot be negative (got {0})")]
    NegativeConsumption(f64),
    #[error("consumption must be a finite number")]
    NonFiniteConsumption,
    #[error("temperature must be a finite number when present")]
    NonFiniteTemperature,
    #[error("meter id is required")]
    EmptyMeterId,
}

/// A single hourly reading reported by a smart meter.
///
/// Values are fixed at construction; the only way to build one is through
/// [`ConsumptionRecord::new`], which rejects negative or non-finite kWh and a
/// non-finite temperature. A missing temperature is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionRecord {
    timestamp: OffsetDateTime,
    consumption_kwh: f64,
    temperature_c: Option<f64>,
    is_weekend: bool,
}

impl ConsumptionRecord {
    pub fn new(
        timestamp: OffsetDateTime,
        consumption_kwh: f64,
        temperature_c: impl Into<Option<f64>>,
        is_weekend: bool,
    ) -> Result<Self, DomainError> {
        let temperature_c = temperature_c.into();
        if !consumption_kwh.is_finite() {
            return Err(DomainError::NonFiniteConsumption);
        }
        if consumption_kwh < 0.0 {
            return Err(DomainError::NegativeConsumption(consumption_kwh));
        }
        if temperature_c.is_some_and(|t| !t.is_finite()) {
            return Err(DomainError::NonFiniteTemperature);
        }

        Ok(Self {
            timestamp,
            consumption_kwh,
            temperature_c,
            is_weekend,
        })
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn consumption_kwh(&self) -> f64 {
        self.consumption_kwh
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.temperature_c
    }

    pub fn is_weekend(&self) -> bool {
        self.is_weekend
    }
}

/// A record together with the meter that reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub meter_id: String,
    pub record: ConsumptionRecord,
}

impl MeterReading {
    pub fn new(meter_id: impl Into<String>, record: ConsumptionRecord) -> Self {
        Self {
            meter_id: meter_id.into(),
            record,
        }
    }
}
