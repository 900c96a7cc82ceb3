//! Search pass-through with a hard time budget.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use pi_api_types::SearchRequest;
use pi_upstream::{IntelligenceApi, UpstreamError};

use crate::api_error::ApiError;
use crate::http_api::ApiState;

pub const QUERY_REQUIRED: &str = "Query is required";
pub const SEARCH_FAILED: &str = "Failed to fetch search results";

/// How a proxied search ended.
#[derive(Debug)]
pub enum SearchOutcome {
    Ok(Value),
    Failed(UpstreamError),
    TimedOut,
}

/// Forward `request` upstream, giving up after `budget`. On timeout the
/// upstream future is dropped, which cancels the in-flight request.
pub async fn proxy_search(
    api: &dyn IntelligenceApi,
    request: &SearchRequest,
    budget: Duration,
) -> SearchOutcome {
    match tokio::time::timeout(budget, api.search(request)).await {
        Ok(Ok(body)) => SearchOutcome::Ok(body),
        Ok(Err(e)) => SearchOutcome::Failed(e),
        Err(_elapsed) => SearchOutcome::TimedOut,
    }
}

/// User-facing 504 message. Built from the budget actually in force.
pub fn timeout_message(budget: Duration) -> String {
    let amount = if budget.subsec_millis() == 0 && budget.as_secs() > 0 {
        format!("{} seconds", budget.as_secs())
    } else {
        format!("{} ms", budget.as_millis())
    };
    format!("Search request took too long (over {amount}). Please try a more specific query.")
}

/// A missing, non-string or blank query is `QUERY_REQUIRED`; any other
/// malformed field reports what serde rejected.
fn parse_request(body: Value) -> Result<SearchRequest, ApiError> {
    match body.get("query").and_then(Value::as_str) {
        Some(query) if !query.trim().is_empty() => {}
        _ => return Err(ApiError::BadRequest(QUERY_REQUIRED.to_string())),
    }
    serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid search request: {e}")))
}

/// POST /api/search
pub(crate) async fn search_proxy(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    };
    let request = parse_request(body)?;

    let budget = state.search_timeout;
    match proxy_search(state.api.as_ref(), &request, budget).await {
        SearchOutcome::Ok(body) => Ok(Json(body)),
        SearchOutcome::Failed(e) => {
            tracing::error!(error = %e, query = %request.query, "search upstream failed");
            Err(ApiError::InternalError(SEARCH_FAILED.to_string()))
        }
        SearchOutcome::TimedOut => {
            tracing::warn!(
                query = %request.query,
                budget_ms = budget.as_millis() as u64,
                "search timed out"
            );
            Err(ApiError::GatewayTimeout(timeout_message(budget)))
        }
    }
}
