//! HTTP surface: health check, demand forecast, meter listing.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use meter_client::domain::{timestamp::lenient, ForecastPoint};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;

use crate::{
    orchestration::{DemandForecaster, ForecastDemandError},
    store::ConsumptionStore,
};

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

impl From<ForecastDemandError> for ApiError {
    fn from(e: ForecastDemandError) -> Self {
        match e {
            ForecastDemandError::InvalidWindow | ForecastDemandError::NoData => Self::BadRequest(e.to_string()),
            ForecastDemandError::ExecutionFailed { .. } | ForecastDemandError::Store(_) => {
                tracing::error!(error = %e, "forecast request failed");
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn default_steps() -> i64 {
    24
}

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    #[serde(with = "lenient")]
    pub start_date: OffsetDateTime,
    #[serde(with = "lenient")]
    pub end_date: OffsetDateTime,
    #[serde(default = "default_steps")]
    pub steps: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

pub struct ApiState<S> {
    pub forecaster: DemandForecaster<S>,
    pub service_name: Arc<str>,
    pub max_steps: usize,
}

impl<S> Clone for ApiState<S> {
    fn clone(&self) -> Self {
        Self {
            forecaster: self.forecaster.clone(),
            service_name: self.service_name.clone(),
            max_steps: self.max_steps,
        }
    }
}

pub fn router<S>(state: ApiState<S>) -> Router
where
    S: ConsumptionStore + 'static,
{
    Router::new()
        .route("/health", get(health::<S>))
        .route("/forecast", post(forecast::<S>))
        .route("/forecast/demand", post(forecast::<S>))
        .route("/meters", get(list_meters::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health<S>(State(state): State<ApiState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn forecast<S>(
    State(state): State<ApiState<S>>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<Vec<ForecastPoint>>, ApiError>
where
    S: ConsumptionStore + 'static,
{
    let Json(req) = payload?;

    if req.start_date >= req.end_date {
        return Err(ForecastDemandError::InvalidWindow.into());
    }
    let steps = usize::try_from(req.steps)
        .ok()
        .filter(|s| (1..=state.max_steps).contains(s))
        .ok_or_else(|| ApiError::BadRequest(format!("steps must be between 1 and {}", state.max_steps)))?;

    let points = state
        .forecaster
        .forecast_demand(req.start_date, req.end_date, steps)
        .await?;

    Ok(Json(points))
}

async fn list_meters<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<String>>, ApiError>
where
    S: ConsumptionStore + 'static,
{
    let ids = state
        .forecaster
        .store()
        .list_meter_ids()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ids.into_iter().collect()))
}
