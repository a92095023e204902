use super::{ConsumptionRecord, DomainError};

/// A smart meter and the readings it has reported so far.
///
/// Records are append-only and only ever handed out as a shared slice.
#[derive(Debug, Clone)]
pub struct Meter {
    meter_id: String,
    location: Option<String>,
    records: Vec<ConsumptionRecord>,
}

impl Meter {
    pub fn new(meter_id: impl Into<String>) -> Result<Self, DomainError> {
        let meter_id = meter_id.into();
        if meter_id.trim().is_empty() {
            return Err(DomainError::EmptyMeterId);
        }

        Ok(Self {
            meter_id,
            location: None,
            records: Vec::new(),
        })
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn meter_id(&self) -> &str {
        &self.meter_id
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn add_record(&mut self, record: ConsumptionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ConsumptionRecord] {
        &self.records
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }
}
