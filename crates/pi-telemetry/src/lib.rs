//! Logging and request tracing for podintel services.
//!
//! - **Logging**: human-readable or JSON output via `tracing-subscriber`,
//!   filtered by `RUST_LOG` with a configurable fallback level.
//! - **Request tracing**: an Axum middleware that assigns every request an
//!   `X-Request-Id`, runs the handler inside an `http_request` span and logs
//!   the outcome with its latency.

pub mod logging;
pub mod tracing_setup;
