use std::sync::Arc;
use std::time::Duration;

use pi_bridge::ApiState;
use pi_core::config::Config;
use pi_daemon::server::Server;
use pi_upstream::MockIntelligenceApi;
use serde_json::Value;

fn mock_server() -> Server {
    let config = Config::default();
    let state = ApiState::with_config(Arc::new(MockIntelligenceApi::new()), &config);
    Server::with_state(config, state)
}

#[tokio::test]
async fn test_embedded_server_serves_api() {
    let server = mock_server();
    let addr = server.start_embedded().await.unwrap();

    let body: Value = reqwest::get(format!("http://{addr}/api/debug-env"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["basic_auth_configured"], false);

    let dashboard: Value = reqwest::get(format!("http://{addr}/api/intelligence/dashboard-proxy"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["total_episodes"], 0);

    server.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = mock_server();
    let addr = server.start_embedded().await.unwrap();
    assert!(reqwest::get(format!("http://{addr}/api/debug-env")).await.is_ok());

    server.shutdown();
    assert!(server.shutdown_handle().is_shutting_down());

    // Give the serve loop a moment to drop the listener.
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();
    let mut refused = false;
    for _ in 0..50 {
        if client
            .get(format!("http://{addr}/api/debug-env"))
            .send()
            .await
            .is_err()
        {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refused, "server still accepting after shutdown");
}

#[tokio::test]
async fn test_run_fails_on_unbindable_address() {
    let mut config = Config::default();
    config.server.host = "256.0.0.1".into();
    let state = ApiState::with_config(Arc::new(MockIntelligenceApi::new()), &config);
    let server = Server::with_state(config, state);

    let err = server.run().await.unwrap_err();
    assert!(err.to_string().contains("failed to bind"));
}
