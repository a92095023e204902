//! Fixed-order ARIMA forecasting over an hourly demand series.
//!
//! A [`ForecastEngine`] starts `Untrained`, becomes `Trained` after one
//! successful [`ForecastEngine::train`], and only then answers
//! [`ForecastEngine::predict`]. Forecast timestamps continue the training
//! series one hour at a time.

use std::fmt;

use meter_client::domain::{ForecastPoint, HourlyDemandPoint};
use time::{Duration, OffsetDateTime};

pub mod arima;

pub use arima::FittedArima;

#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("cannot train on an empty series")]
    EmptySeries,
    #[error("invalid training series: {0}")]
    InvalidInput(String),
    #[error("model fitting failed: {0}")]
    Fitting(String),
    #[error("model is not trained")]
    NotTrained,
    #[error("model is already trained")]
    AlreadyTrained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOrder {
    pub ar_order: usize,
    pub differencing: usize,
}

impl Default for ModelOrder {
    fn default() -> Self {
        Self {
            ar_order: 5,
            differencing: 1,
        }
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},0)", self.ar_order, self.differencing)
    }
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    fit: FittedArima,
    last_timestamp: OffsetDateTime,
}

impl TrainedModel {
    pub fn fit(&self) -> &FittedArima {
        &self.fit
    }

    pub fn last_timestamp(&self) -> OffsetDateTime {
        self.last_timestamp
    }
}

#[derive(Debug, Clone)]
pub enum ForecastEngine {
    Untrained { order: ModelOrder },
    Trained(TrainedModel),
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(ModelOrder::default())
    }
}

impl ForecastEngine {
    pub fn new(order: ModelOrder) -> Self {
        Self::Untrained { order }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, Self::Trained(_))
    }

    /// Fit the model to `series`. On failure the engine stays untrained.
    pub fn train(&mut self, series: &[HourlyDemandPoint]) -> Result<(), ForecastError> {
        let order = match self {
            Self::Untrained { order } => *order,
            Self::Trained(_) => return Err(ForecastError::AlreadyTrained),
        };

        let last = series.last().ok_or(ForecastError::EmptySeries)?;
        if series.windows(2).any(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(ForecastError::InvalidInput(
                "timestamps must be strictly ascending".to_string(),
            ));
        }

        let timestamps: Vec<OffsetDateTime> = series.iter().map(|p| p.timestamp).collect();
        let values: Vec<f64> = series.iter().map(|p| p.total_consumption).collect();
        let fit = FittedArima::fit(&timestamps, &values, order)?;

        *self = Self::Trained(TrainedModel {
            fit,
            last_timestamp: last.timestamp,
        });
        Ok(())
    }

    /// `steps` raw model predictions at `last + 1h, last + 2h, ...`.
    pub fn predict(&self, steps: usize) -> Result<Vec<ForecastPoint>, ForecastError> {
        let model = match self {
            Self::Trained(model) => model,
            Self::Untrained { .. } => return Err(ForecastError::NotTrained),
        };

        let points = model
            .fit
            .forecast(steps)?
            .into_iter()
            .zip(1i64..)
            .map(|(value, hour)| ForecastPoint {
                timestamp: model.last_timestamp + Duration::hours(hour),
                predicted_consumption_kwh: value,
            })
            .collect();

        Ok(points)
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Trained(model) => model.fit.summary(),
            Self::Untrained { .. } => "Model not trained.".to_string(),
        }
    }
}
