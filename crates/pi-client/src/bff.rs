//! Thin HTTP client for the podintel backend (`pi-bridge`).

use pi_api_types::{DashboardResponse, SearchRequest};
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{ClientError, ErrorBody, SearchError};

#[derive(Clone)]
pub struct BffClient {
    client: reqwest::Client,
    base_url: String,
}

impl BffClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/intelligence/dashboard-proxy
    pub async fn dashboard(&self) -> Result<DashboardResponse, ClientError> {
        let resp = self
            .client
            .get(format!("{}/api/intelligence/dashboard-proxy", self.base_url))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message: error_message(resp).await,
            });
        }
        resp.json::<DashboardResponse>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// POST /api/search, with the backend's status codes mapped onto
    /// [`SearchError`] variants.
    pub async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let resp = self
            .client
            .post(format!("{}/api/search", self.base_url))
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Value>()
                .await
                .map_err(|e| SearchError::Parse(e.to_string()));
        }

        let message = error_message(resp).await;
        Err(match status {
            StatusCode::BAD_REQUEST => SearchError::InvalidQuery(message),
            StatusCode::GATEWAY_TIMEOUT => SearchError::TimedOut(message),
            other => SearchError::Failed {
                status: other.as_u16(),
                message,
            },
        })
    }
}

/// Best-effort message from an error response: the JSON `error` field when
/// present, otherwise the status reason.
async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("Unknown Status")
        .to_string();
    match resp.json::<ErrorBody>().await {
        Ok(body) => body.message(),
        Err(_) => fallback,
    }
}
