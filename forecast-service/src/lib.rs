pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod forecasting;
pub mod loader;
pub mod metrics_server;
pub mod observability;
pub mod orchestration;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod store;
pub mod synthetic;
pub mod transform;

pub use orchestration::DemandForecaster;
pub use pipeline::{Envelope, Pipeline};
