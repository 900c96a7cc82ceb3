//! podintel server: the dashboard API, search proxy and (optionally) the
//! static front-end.

use anyhow::{Context, Result};
use pi_core::config::{Config, LogFormat};
use pi_daemon::server::Server;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional.
    dotenv::dotenv().ok();

    let config = Config::load().context("failed to load configuration")?;

    pi_telemetry::logging::init(
        "podintel-server",
        &config.general.log_level,
        config.general.log_format == LogFormat::Json,
    );
    info!(version = env!("CARGO_PKG_VERSION"), "podintel server starting");

    let server = Server::new(config);
    let shutdown = server.shutdown_handle();

    // Wire ctrl-c to trigger graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("ctrl-c received, initiating shutdown");
        shutdown.trigger();
    });

    server.run().await
}
