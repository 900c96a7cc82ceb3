use std::io::Write;

use pi_core::config::{Config, Environment, LogFormat};
use pi_core::data_mode::DataMode;

#[test]
fn default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.upstream.base_url, "http://localhost:8000");
    assert_eq!(cfg.upstream.request_timeout_secs, 30);
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert!(cfg.server.static_dir.is_none());
    assert_eq!(cfg.search.timeout_secs, 40);
    assert_eq!(cfg.search.cache_ttl_secs, 300);
    assert_eq!(cfg.search.cache_capacity, 100);
    assert_eq!(cfg.general.environment, Environment::Production);
    assert_eq!(cfg.general.log_format, LogFormat::Human);
    assert!(!cfg.auth.is_enabled());
    assert_eq!(cfg.initial_data_mode(), DataMode::Live);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_roundtrip_never_writes_password() {
    let mut cfg = Config::default();
    cfg.auth.basic_auth_password = Some("hunter2".into());
    let toml_str = cfg.to_toml().expect("serialize to toml");
    assert!(toml_str.contains("localhost:8000"));
    assert!(!toml_str.contains("hunter2"));

    let parsed: Config = toml::from_str(&toml_str).expect("parse toml back");
    assert_eq!(parsed.server.port, cfg.server.port);
    assert!(parsed.auth.basic_auth_password.is_none());
}

#[test]
fn config_partial_toml() {
    let partial = r#"
[general]
environment = "development"
use_mock_data = true

[search]
timeout_secs = 10
"#;
    let cfg: Config = toml::from_str(partial).expect("parse partial");
    assert!(cfg.general.environment.is_development());
    assert_eq!(cfg.initial_data_mode(), DataMode::Demo);
    assert_eq!(cfg.search.timeout_secs, 10);
    // defaults should fill in the rest
    assert_eq!(cfg.search.cache_capacity, 100);
    assert_eq!(cfg.general.log_level, "info");
    cfg.validate().expect("config validates");
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[upstream]\nbase_url = \"https://intel.example.com\"\n\n[server]\nport = 4100\nstatic_dir = \"./dist\""
    )
    .unwrap();

    let cfg = Config::load_from(file.path()).expect("load config file");
    assert_eq!(cfg.upstream.base_url, "https://intel.example.com");
    assert_eq!(cfg.server.bind_addr(), "0.0.0.0:4100");
    assert_eq!(cfg.server.static_dir.as_deref(), Some("./dist"));
}

#[test]
fn load_from_missing_file_is_io_error() {
    let err = Config::load_from("/definitely/not/here/config.toml").expect_err("missing file");
    assert!(err.to_string().starts_with("io:"));
}

#[test]
fn invalid_base_url_fails_validation() {
    let mut cfg = Config::default();
    cfg.upstream.base_url = "ftp://intel.example.com".into();
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("base_url"));
}

#[test]
fn zero_search_timeout_fails_validation() {
    let mut cfg = Config::default();
    cfg.search.timeout_secs = 0;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn unknown_environment_is_rejected() {
    let mut cfg = Config::default();
    let err = cfg
        .apply_env_with(|key| (key == "APP_ENV").then(|| "staging".to_string()))
        .expect_err("unknown environment");
    assert!(err.to_string().contains("APP_ENV"));
}
