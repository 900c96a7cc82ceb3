use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID made available to handlers through request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Generate a request/trace ID (32 hex characters).
pub fn generate_trace_id() -> String {
    Uuid::new_v4().as_simple().to_string()
}

/// Axum middleware that injects `X-Request-Id` headers and wraps the request
/// in an `http_request` span.
///
/// If the incoming request already has an `X-Request-Id` header, that value is
/// reused. Otherwise a new ID is generated. The response always carries the
/// header for correlation.
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(generate_trace_id);

    let header_value = HeaderValue::from_str(&request_id)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER, header_value.clone());
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    span.in_scope(|| {
        let status = response.status().as_u16();
        if response.status().is_server_error() {
            tracing::warn!(status, elapsed_ms, "request failed");
        } else {
            tracing::info!(status, elapsed_ms, "request completed");
        }
    });

    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER, header_value);
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
