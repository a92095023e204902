//! ARIMA(p, d, 0) fitting on top of `anofox_forecast`.
//!
//! The library needs at least `d + max(p, q) + 2` observations. Short series
//! are fitted with the largest AR order they can support, down to a random
//! walk with drift.

use std::fmt::Write as _;

use anofox_forecast::{
    core::TimeSeries,
    models::{arima::ARIMA, Forecaster},
};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use super::{ForecastError, ModelOrder};

fn to_chrono(ts: OffsetDateTime) -> Result<DateTime<Utc>, ForecastError> {
    DateTime::<Utc>::from_timestamp(ts.unix_timestamp(), ts.nanosecond())
        .ok_or_else(|| ForecastError::InvalidInput(format!("timestamp {ts} is out of range")))
}

/// Largest AR order <= `requested` the library accepts for `n` observations.
fn supported_ar_order(requested: usize, differencing: usize, n: usize) -> Option<usize> {
    (0..=requested).rev().find(|&k| n >= differencing + k + 2)
}

#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ModelOrder,
    model: ARIMA,
    nobs: usize,
}

impl FittedArima {
    pub fn fit(timestamps: &[OffsetDateTime], values: &[f64], order: ModelOrder) -> Result<Self, ForecastError> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidInput(format!(
                "{} timestamps for {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Fitting("series contains non-finite values".to_string()));
        }

        let p = supported_ar_order(order.ar_order, order.differencing, values.len()).ok_or_else(|| {
            ForecastError::Fitting(format!(
                "need at least {} observations for differencing order {}, got {}",
                order.differencing + 2,
                order.differencing,
                values.len()
            ))
        })?;
        if p < order.ar_order {
            tracing::debug!(requested = order.ar_order, used = p, n = values.len(), "AR order lowered for short series");
        }

        let stamps = timestamps.iter().copied().map(to_chrono).collect::<Result<Vec<_>, _>>()?;
        let series =
            TimeSeries::univariate(stamps, values.to_vec()).map_err(|e| ForecastError::InvalidInput(e.to_string()))?;

        let mut model = ARIMA::new(p, order.differencing, 0);
        model.fit(&series).map_err(|e| ForecastError::Fitting(e.to_string()))?;

        Ok(Self {
            order,
            model,
            nobs: values.len(),
        })
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn effective_ar_order(&self) -> usize {
        self.model.spec().p
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        self.model.ar_coefficients()
    }

    /// Mean of the differenced series, estimated for every order.
    pub fn intercept(&self) -> f64 {
        self.model.intercept()
    }

    pub fn aic(&self) -> Option<f64> {
        self.model.aic()
    }

    pub fn bic(&self) -> Option<f64> {
        self.model.bic()
    }

    /// Point forecasts on the original scale.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        let forecast = self
            .model
            .predict(steps)
            .map_err(|e| ForecastError::Fitting(e.to_string()))?;
        Ok(forecast.primary().to_vec())
    }

    pub fn summary(&self) -> String {
        let spec = self.model.spec();
        let mut out = String::new();
        let _ = writeln!(out, "ARIMA({},{},{}) Results", spec.p, spec.d, spec.q);
        if spec.p != self.order.ar_order {
            let _ = writeln!(out, "Requested order:     {}", self.order);
        }
        let _ = writeln!(out, "No. Observations:    {}", self.nobs);
        let _ = writeln!(out, "intercept            {:.6}", self.intercept());
        for (i, c) in self.ar_coefficients().iter().enumerate() {
            let _ = writeln!(out, "ar.L{:<16} {c:.6}", i + 1);
        }
        match (self.aic(), self.bic()) {
            (Some(aic), Some(bic)) => {
                let _ = writeln!(out, "AIC                  {aic:.3}");
                let _ = write!(out, "BIC                  {bic:.3}");
            }
            _ => out.push_str("AIC/BIC              n/a"),
        }
        out
    }
}
