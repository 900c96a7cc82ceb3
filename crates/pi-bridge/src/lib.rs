//! HTTP backend-for-frontend for the podintel dashboard.
//!
//! Serves three JSON routes in front of the upstream intelligence API:
//! - `GET /api/intelligence/dashboard-proxy`: discovery plus parallel briefs
//! - `POST /api/search`: pass-through with a time budget
//! - `GET /api/debug-env`: non-secret configuration snapshot
//!
//! Everything else falls through to an optional static front-end behind an
//! HTTP Basic gate ([`auth`]).

pub mod api_error;
pub mod auth;
pub mod dashboard_proxy;
pub mod debug_env;
pub mod http_api;
pub mod search_proxy;

pub use http_api::{api_router, ApiState};
