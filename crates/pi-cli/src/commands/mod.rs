pub mod analytics;
pub mod dashboard;
pub mod search;
pub mod share;
pub mod signals;

use std::sync::Arc;

use pi_client::{BffClient, ClientError, IntelligenceHooks, QueryClient};
use pi_core::config::Config;
use pi_core::data_mode::{DataMode, DataModeContext};
use pi_upstream::{HttpIntelligenceClient, UpstreamError};

/// Clients, data mode and output style shared by every subcommand.
pub struct CommandContext {
    pub api_url: String,
    pub upstream_url: String,
    pub data_mode: DataModeContext,
    pub json: bool,
    pub bff: BffClient,
    pub hooks: IntelligenceHooks,
}

impl CommandContext {
    pub fn new(api_url: &str, upstream_url: &str, mode: DataMode, json: bool) -> Self {
        let bff = BffClient::new(api_url);
        let upstream = Arc::new(HttpIntelligenceClient::new(upstream_url));
        Self {
            api_url: bff.base_url().to_string(),
            upstream_url: upstream.base_url().to_string(),
            data_mode: DataModeContext::new(mode),
            json,
            hooks: IntelligenceHooks::new(QueryClient::new(), upstream, bff.clone()),
            bff,
        }
    }

    pub fn mode(&self) -> DataMode {
        self.data_mode.current()
    }

    /// Fail early for operations with no demo counterpart.
    pub fn require_live(&self, what: &str) -> anyhow::Result<()> {
        if self.mode().is_demo() {
            anyhow::bail!("{what} is only available with live data (drop --demo)");
        }
        Ok(())
    }
}

/// `--demo` wins; otherwise `USE_MOCK_DATA` decides, as it does for the server.
pub fn initial_mode<F>(demo: bool, lookup: F) -> anyhow::Result<DataMode>
where
    F: Fn(&str) -> Option<String>,
{
    if demo {
        return Ok(DataMode::Demo);
    }
    let mut config = Config::default();
    config.apply_env_with(|key| {
        if key == "USE_MOCK_DATA" {
            lookup(key)
        } else {
            None
        }
    })?;
    Ok(config.initial_data_mode())
}

/// Map client errors to user-friendly messages.
pub fn friendly_error(err: ClientError, url: &str) -> anyhow::Error {
    match err {
        ClientError::Http(detail) | ClientError::Upstream(UpstreamError::HttpError(detail)) => {
            anyhow::anyhow!(
                "Could not reach {url}: {detail}\n  \
                 (hint: start it with `podintel-server` or check --api-url / --upstream-url)"
            )
        }
        ClientError::Backend { status, message } => {
            anyhow::anyhow!("Server returned HTTP {status}: {message}")
        }
        other => anyhow::Error::new(other),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_mode_rejects_live_only_commands() {
        let ctx = CommandContext::new("http://a", "http://b", DataMode::Demo, false);
        let err = ctx.require_live("signals").unwrap_err();
        assert!(err.to_string().contains("--demo"));

        let live = CommandContext::new("http://a/", "http://b", DataMode::Live, false);
        assert!(live.require_live("signals").is_ok());
        assert_eq!(live.api_url, "http://a");
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn mock_data_env_selects_demo() {
        assert_eq!(initial_mode(false, lookup(&[])).unwrap(), DataMode::Live);
        assert_eq!(
            initial_mode(false, lookup(&[("USE_MOCK_DATA", "true")])).unwrap(),
            DataMode::Demo
        );
        assert_eq!(
            initial_mode(false, lookup(&[("USE_MOCK_DATA", "false")])).unwrap(),
            DataMode::Live
        );
        assert_eq!(
            initial_mode(true, lookup(&[("USE_MOCK_DATA", "false")])).unwrap(),
            DataMode::Demo
        );
        assert!(initial_mode(false, lookup(&[("USE_MOCK_DATA", "maybe")])).is_err());
    }

    #[tokio::test]
    async fn mock_data_env_serves_dashboard_offline() {
        let mode = initial_mode(false, lookup(&[("USE_MOCK_DATA", "true")])).unwrap();
        let unroutable = "http://127.0.0.1:9";
        let ctx = CommandContext::new(unroutable, unroutable, mode, true);
        assert!(ctx.mode().is_demo());
        assert!(dashboard::run(&ctx).await.is_ok());
        assert!(ctx.require_live("signals").is_err());
    }

    #[test]
    fn friendly_error_mentions_url() {
        let err = friendly_error(ClientError::Http("connection refused".into()), "http://x:1");
        assert!(err.to_string().contains("http://x:1"));

        let err = friendly_error(
            ClientError::Backend {
                status: 500,
                message: "Failed to fetch dashboard data".into(),
            },
            "http://x:1",
        );
        assert!(err.to_string().contains("HTTP 500"));
    }
}
