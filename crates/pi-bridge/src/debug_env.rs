//! Non-secret view of the running configuration.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use pi_core::config::Config;

use crate::http_api::ApiState;

/// Selected settings for troubleshooting deployments. Holds no secrets:
/// the basic-auth password is reduced to whether one is set.
#[derive(Debug, Clone, Serialize)]
pub struct DebugEnv {
    pub version: String,
    pub environment: String,
    pub api_url: String,
    pub use_mock_data: bool,
    pub basic_auth_configured: bool,
    pub search_timeout_secs: u64,
    pub static_dir: Option<String>,
    pub uptime_seconds: u64,
}

impl DebugEnv {
    pub fn from_config(config: &Config) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: config.general.environment.as_str().to_string(),
            api_url: config.upstream.base_url.clone(),
            use_mock_data: config.general.use_mock_data,
            basic_auth_configured: config.auth.is_enabled(),
            search_timeout_secs: config.search.timeout_secs,
            static_dir: config.server.static_dir.clone(),
            uptime_seconds: 0,
        }
    }
}

/// GET /api/debug-env
pub(crate) async fn debug_env(State(state): State<Arc<ApiState>>) -> Json<DebugEnv> {
    let mut snapshot = state.debug_env.clone();
    snapshot.uptime_seconds = state.start_time.elapsed().as_secs();
    Json(snapshot)
}
