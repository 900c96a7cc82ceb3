use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use pi_api_types::{
    AnalyticsQuery, SearchRequest, SharePlatform, ShareRequest, SignalType, SignalsQuery,
};
use pi_upstream::{HttpIntelligenceClient, IntelligenceApi, UpstreamError};

type Captured = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn spawn_upstream(captured: Captured) -> String {
    let velocity_capture = captured.clone();
    let signals_capture = captured.clone();

    let app = Router::new()
        .route(
            "/api/intelligence/find-episodes-with-intelligence",
            get(|| async {
                Json(json!({
                    "episodes": [
                        { "episode_id": "ep-1", "title": "First" },
                        { "id": "ep-2" }
                    ],
                    "total": 2
                }))
            }),
        )
        .route(
            "/api/intelligence/brief/{id}",
            get(|Path(id): Path<String>| async move {
                if id == "gone" {
                    return Err(StatusCode::NOT_FOUND);
                }
                if id == "slow" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(Json(json!({
                    "episode_id": id,
                    "title": "Brief",
                    "relevance_score": 0.4,
                    "duration_seconds": 3600.0,
                    "key_insights": null,
                    "signals": [{ "type": "investable", "content": "x", "confidence": 0.9 }]
                })))
            }),
        )
        .route(
            "/api/search",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "echo": body, "results": [] }))
            }),
        )
        .route(
            "/api/topic-velocity",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let captured = velocity_capture.clone();
                async move {
                    captured.lock().unwrap().push(q);
                    Json(json!({
                        "data": { "DePIN": [{ "week": "2025-W11", "mentions": 4, "date": "2025-03-10" }] },
                        "metadata": { "total_episodes": 4, "date_range": "x", "data_completeness": "full" }
                    }))
                }
            }),
        )
        .route(
            "/api/sentiment_analysis_v2",
            get(|| async {
                Json(json!({
                    "data": [{ "topic": "DePIN", "week": "2025-W11", "sentiment": 0.2, "episodeCount": 3 }]
                }))
            }),
        )
        .route(
            "/api/signals",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let captured = signals_capture.clone();
                async move {
                    captured.lock().unwrap().push(q);
                    Json(json!({ "signals": [] }))
                }
            }),
        )
        .route(
            "/api/intelligence/share",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "success": true, "platform": body["platform"] }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn discovery_unwraps_envelope_and_id_alias() {
    let base = spawn_upstream(Captured::default()).await;
    let client = HttpIntelligenceClient::new(base);

    let episodes = client.find_episodes_with_intelligence().await.unwrap();
    let ids: Vec<&str> = episodes.iter().map(|e| e.episode_id.as_str()).collect();
    assert_eq!(ids, vec!["ep-1", "ep-2"]);
    assert_eq!(episodes[0].title.as_deref(), Some("First"));
    assert!(episodes[1].title.is_none());
}

#[tokio::test]
async fn discovery_skips_entries_without_id() {
    let app = Router::new().route(
        "/api/intelligence/find-episodes-with-intelligence",
        get(|| async {
            Json(json!([
                { "episode_id": "a" },
                { "title": "no id" },
                { "episode_id": "c" }
            ]))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = HttpIntelligenceClient::new(format!("http://{addr}"));

    let episodes = client.find_episodes_with_intelligence().await.unwrap();
    let ids: Vec<&str> = episodes.iter().map(|e| e.episode_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn brief_parses_raw_fields() {
    let base = spawn_upstream(Captured::default()).await;
    let client = HttpIntelligenceClient::new(base);

    let brief = client.episode_brief("ep-9").await.unwrap();
    assert_eq!(brief.episode_id.as_deref(), Some("ep-9"));
    assert_eq!(brief.relevance_score, Some(0.4));
    assert_eq!(brief.duration_seconds, Some(3600));
    assert!(brief.key_insights.is_none());
    assert_eq!(brief.signals.map(|s| s.len()), Some(1));
    assert!(brief.summary.is_none());
}

#[tokio::test]
async fn non_success_status_carries_status_text() {
    let base = spawn_upstream(Captured::default()).await;
    let client = HttpIntelligenceClient::new(base);

    match client.episode_brief("gone").await {
        Err(UpstreamError::Status {
            status,
            status_text,
        }) => {
            assert_eq!(status, 404);
            assert_eq!(status_text, "Not Found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn search_forwards_body_unchanged() {
    let base = spawn_upstream(Captured::default()).await;
    let client = HttpIntelligenceClient::new(base);

    let mut req = SearchRequest::new("ai agents");
    req.offset = 20;
    let resp = client.search(&req).await.unwrap();
    assert_eq!(resp["echo"]["query"], "ai agents");
    assert_eq!(resp["echo"]["limit"], 10);
    assert_eq!(resp["echo"]["offset"], 20);
}

#[tokio::test]
async fn analytics_forward_query_parameters() {
    let captured = Captured::default();
    let base = spawn_upstream(captured.clone()).await;
    let client = HttpIntelligenceClient::new(base);

    let query = AnalyticsQuery {
        weeks: 4,
        topics: vec!["AI Agents".into(), "DePIN".into()],
    };
    let velocity = client.topic_velocity(&query).await.unwrap();
    assert_eq!(velocity.data["DePIN"][0].mentions, 4);

    let sentiment = client.sentiment_analysis(&query).await.unwrap();
    assert_eq!(sentiment.len(), 1);
    assert_eq!(sentiment[0].episode_count, 3);

    client
        .signals(&SignalsQuery {
            signal_type: Some(SignalType::Investable),
            limit: Some(5),
        })
        .await
        .unwrap();

    let seen = captured.lock().unwrap().clone();
    assert_eq!(seen[0].get("weeks").map(String::as_str), Some("4"));
    assert_eq!(
        seen[0].get("topics").map(String::as_str),
        Some("AI Agents,DePIN")
    );
    assert_eq!(seen[1].get("limit").map(String::as_str), Some("5"));
}

#[tokio::test]
async fn share_posts_request() {
    let base = spawn_upstream(Captured::default()).await;
    let client = HttpIntelligenceClient::new(base);

    let resp = client
        .share(&ShareRequest {
            episode_id: "ep-1".into(),
            platform: SharePlatform::Slack,
            recipient: None,
            include_summary: Some(true),
            personal_note: None,
        })
        .await
        .unwrap();
    assert_eq!(resp["success"], true);
    assert_eq!(resp["platform"], "slack");
}

#[tokio::test]
async fn unreachable_upstream_is_http_error() {
    let client = HttpIntelligenceClient::new("http://127.0.0.1:9");
    let err = client.find_episodes_with_intelligence().await.unwrap_err();
    assert!(matches!(err, UpstreamError::HttpError(_)));
}

#[tokio::test]
async fn request_timeout_maps_to_timeout() {
    let base = spawn_upstream(Captured::default()).await;
    let client =
        HttpIntelligenceClient::new(base).with_request_timeout(Duration::from_millis(50));

    let err = client.episode_brief("slow").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Timeout));
}
