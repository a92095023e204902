use std::time::Duration;

use meter_client::domain::{timestamp::format_timestamp, ForecastPoint};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("cannot reach forecast service: {0}")]
    Connectivity(#[source] reqwest::Error),
    #[error("forecast service answered {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("unexpected response from forecast service: {0}")]
    Decode(String),
    #[error("cannot format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Serialize)]
struct ForecastRequestBody {
    start_date: String,
    end_date: String,
    steps: usize,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Thin HTTP client for the forecast service.
#[derive(Clone)]
pub struct ForecastClient {
    http: reqwest::Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(ClientError::Connectivity)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` only when `/health` answers 200.
    pub async fn health(&self) -> bool {
        match self.http.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }

    pub async fn forecast(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        steps: usize,
    ) -> Result<Vec<ForecastPoint>, ClientError> {
        let body = ForecastRequestBody {
            start_date: format_timestamp(start)?,
            end_date: format_timestamp(end)?,
            steps,
        };

        let resp = self
            .http
            .post(format!("{}/forecast/demand", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Connectivity)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.detail)
                .unwrap_or(text);
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        resp.json::<Vec<ForecastPoint>>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}
