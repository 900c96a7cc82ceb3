use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::data_mode::DataMode;

/// Top-level configuration, loaded from an optional
/// `~/.podintel/config.toml` and then overridden from the environment.
///
/// **Security**: the basic-auth password is only ever read from the
/// environment or the file; it is never serialized back out and is redacted
/// from `Debug` output.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("general", &self.general)
            .field("upstream", &self.upstream)
            .field("server", &self.server)
            .field("search", &self.search)
            .field("auth", &self.auth)
            .finish()
    }
}

impl Config {
    /// Load config from `~/.podintel/config.toml` (defaults when the file
    /// does not exist), apply environment overrides, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut cfg = if path.exists() {
            Self::parse_file(&path)?
        } else {
            Config::default()
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let cfg = Self::parse_file(&path.into())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary lookup (tests pass a map here
    /// instead of mutating the process environment).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("API_URL") {
            self.upstream.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("USE_MOCK_DATA") {
            self.general.use_mock_data = parse_bool("USE_MOCK_DATA", &raw)?;
        }
        if let Some(password) = lookup("BASIC_AUTH_PASSWORD") {
            // An empty value means "not configured".
            self.auth.basic_auth_password = Some(password).filter(|p| !p.is_empty());
        }
        if let Some(raw) = lookup("APP_ENV") {
            self.general.environment = raw.parse()?;
        }
        if let Some(raw) = lookup("LOG_FORMAT") {
            self.general.log_format = raw.parse()?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(raw) = lookup("PORT") {
            self.server.port = parse_number("PORT", &raw)?;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.server.static_dir = Some(dir).filter(|d| !d.is_empty());
        }
        if let Some(raw) = lookup("SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_number("SEARCH_TIMEOUT_SECS", &raw)?;
        }
        Ok(())
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upstream.validate()?;
        self.search.validate()?;
        Ok(())
    }

    /// Data mode a fresh session starts in.
    pub fn initial_data_mode(&self) -> DataMode {
        if self.general.use_mock_data {
            DataMode::Demo
        } else {
            DataMode::Live
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".podintel")
            .join("config.toml")
    }

    fn parse_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("invalid value for {key}: {value:?}")]
    Env { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::Env {
                key: "APP_ENV".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" | "pretty" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::Env {
                key: "LOG_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Start sessions in demo mode instead of hitting the upstream API.
    #[serde(default)]
    pub use_mock_data: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            use_mock_data: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout for discovery, brief and analytics calls.
    /// Search requests are bounded by [`SearchConfig::timeout_secs`] instead.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl UpstreamConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "upstream.base_url must start with http:// or https:// (got '{}')",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upstream.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with the built dashboard front-end, served for non-API paths.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Budget for a single proxied search call.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "search.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "search.cache_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "search.cache_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_search_timeout() -> u64 {
    40
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_capacity() -> usize {
    100
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When `Some`, non-API pages require HTTP Basic auth (outside development).
    #[serde(default, skip_serializing)]
    pub basic_auth_password: Option<String>,
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        self.basic_auth_password.is_some()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "basic_auth_password",
                &self.basic_auth_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
