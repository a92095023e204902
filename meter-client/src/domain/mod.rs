pub mod consumption_record;
pub mod demand;
pub mod meter;
pub mod timestamp;

pub use consumption_record::{ConsumptionRecord, DomainError, MeterReading};
pub use demand::{round_kwh, truncate_to_hour, ForecastPoint, HourlyDemandPoint};
pub use meter::Meter;
