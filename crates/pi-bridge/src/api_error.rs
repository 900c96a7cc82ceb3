//! HTTP API error types.
//!
//! Every failure a handler can return maps to a status code and a JSON body
//! with an `error` message (and `details` where the upstream cause is
//! worth surfacing).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur in the HTTP API layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed or invalid.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An upstream call failed; `details` carries the upstream cause.
    #[error("{error}: {details}")]
    Upstream { error: String, details: String },

    /// An internal server error occurred.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The upstream did not answer within the allotted budget.
    #[error("gateway timeout: {0}")]
    GatewayTimeout(String),
}

// ---------------------------------------------------------------------------
// IntoResponse implementation
// ---------------------------------------------------------------------------

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Upstream { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": error, "details": details }),
            ),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
