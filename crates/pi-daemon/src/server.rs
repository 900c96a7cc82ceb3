use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use pi_bridge::{api_router, ApiState};
use pi_core::config::Config;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::shutdown::ShutdownSignal;

/// The podintel HTTP server.
///
/// Owns the shared API state and a [`ShutdownSignal`]. `run` blocks until
/// shutdown; `start_embedded` binds an ephemeral local port and returns.
pub struct Server {
    config: Config,
    state: Arc<ApiState>,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Server talking to the upstream named in `config`.
    pub fn new(config: Config) -> Self {
        let state = ApiState::from_config(&config);
        Self::with_state(config, state)
    }

    pub fn with_state(config: Config, state: ApiState) -> Self {
        Self {
            config,
            state: Arc::new(state),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Returns a handle that can be used to trigger shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api_state(&self) -> &Arc<ApiState> {
        &self.state
    }

    fn log_startup(&self) {
        info!(
            environment = self.config.general.environment.as_str(),
            upstream = %self.config.upstream.base_url,
            initial_mode = %self.config.initial_data_mode(),
            basic_auth = self.config.auth.is_enabled(),
            search_timeout_secs = self.config.search.timeout_secs,
            static_dir = self.config.server.static_dir.as_deref().unwrap_or("-"),
            "podintel server configured"
        );
    }

    /// Bind `127.0.0.1:0`, serve in the background and return the bound
    /// address. The caller owns the `Server` and calls `shutdown()` to stop.
    pub async fn start_embedded(&self) -> Result<SocketAddr> {
        self.log_startup();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind ephemeral port")?;
        let addr = listener.local_addr()?;

        let router = api_router(self.state.clone());
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.wait().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "API server error");
            }
        });
        info!(%addr, "embedded API server listening");
        Ok(addr)
    }

    /// Serve on the configured address until shutdown is triggered.
    pub async fn run(&self) -> Result<()> {
        self.log_startup();
        let bind_addr = self.config.server.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        info!(%bind_addr, "API server listening");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, api_router(self.state.clone()))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .context("API server error")?;

        info!("server stopped");
        Ok(())
    }
}
