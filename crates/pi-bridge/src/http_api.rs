//! Axum router and shared state for the podintel HTTP API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use pi_core::config::{Config, Environment};
use pi_telemetry::tracing_setup::request_id_middleware;
use pi_upstream::{HttpIntelligenceClient, IntelligenceApi};

use crate::auth::BasicAuthLayer;
use crate::dashboard_proxy::dashboard_proxy;
use crate::debug_env::{debug_env, DebugEnv};
use crate::search_proxy::search_proxy;

// ---------------------------------------------------------------------------
// ApiState
// ---------------------------------------------------------------------------

/// Shared application state for all HTTP handlers.
pub struct ApiState {
    pub api: Arc<dyn IntelligenceApi>,
    pub search_timeout: Duration,
    pub environment: Environment,
    pub basic_auth_password: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub debug_env: DebugEnv,
    pub start_time: Instant,
}

impl ApiState {
    /// State with default settings around the given upstream.
    pub fn new(api: Arc<dyn IntelligenceApi>) -> Self {
        Self::with_config(api, &Config::default())
    }

    pub fn with_config(api: Arc<dyn IntelligenceApi>, config: &Config) -> Self {
        Self {
            api,
            search_timeout: Duration::from_secs(config.search.timeout_secs),
            environment: config.general.environment,
            basic_auth_password: config.auth.basic_auth_password.clone(),
            static_dir: config.server.static_dir.as_ref().map(PathBuf::from),
            debug_env: DebugEnv::from_config(config),
            start_time: Instant::now(),
        }
    }

    /// State talking to the real upstream named in `config`.
    pub fn from_config(config: &Config) -> Self {
        let api = Arc::new(HttpIntelligenceClient::from_config(&config.upstream));
        Self::with_config(api, config)
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn is_local_origin(origin: &str) -> bool {
    ["http://localhost", "http://127.0.0.1", "https://localhost", "https://127.0.0.1"]
        .iter()
        .any(|prefix| origin.starts_with(prefix))
}

/// Build the full router: JSON API routes, the optional static front-end,
/// the basic-auth gate, request IDs and CORS.
pub fn api_router(state: Arc<ApiState>) -> Router {
    let mut router = Router::new()
        .route("/api/intelligence/dashboard-proxy", get(dashboard_proxy))
        .route("/api/search", post(search_proxy))
        .route("/api/debug-env", get(debug_env));

    if let Some(dir) = &state.static_dir {
        tracing::info!(dir = %dir.display(), "serving static front-end");
        let serve_dir = ServeDir::new(dir).append_index_html_on_directories(true);
        router = router.fallback_service(serve_dir);
    }

    router
        .layer(BasicAuthLayer::new(
            state.basic_auth_password.clone(),
            state.environment,
        ))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(
                    |origin: &axum::http::HeaderValue, _parts: &axum::http::request::Parts| {
                        origin.to_str().map(is_local_origin).unwrap_or(false)
                    },
                ))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ]),
        )
        .with_state(state)
}
