pub mod consumption_queries;

pub use consumption_queries::{ConsumptionRow, HourlyTotalRow};
