use std::fmt::Write as _;

use pi_api_types::SearchRequest;
use pi_client::{SearchClient, SearchError};
use serde_json::Value;

use super::{print_json, CommandContext};

/// Run the `search` subcommand through the server's search proxy.
pub async fn run(
    ctx: &CommandContext,
    query: String,
    limit: u32,
    offset: u32,
) -> anyhow::Result<()> {
    let client = SearchClient::new(ctx.bff.clone());
    let request = SearchRequest {
        query,
        limit,
        offset,
    };

    let body = client.search(&request).await.map_err(|e| match e {
        SearchError::TimedOut(message) => {
            anyhow::anyhow!("{message}\n  (hint: try a narrower query)")
        }
        SearchError::Http(detail) => anyhow::anyhow!(
            "Could not reach {}: {detail}\n  \
             (hint: start it with `podintel-server` or check --api-url)",
            ctx.api_url
        ),
        other => anyhow::Error::new(other),
    })?;

    if ctx.json {
        return print_json(&body);
    }
    print!("{}", render(&request.query, &body));
    Ok(())
}

fn field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| item.get(*k).and_then(Value::as_str))
}

/// Summarize a search body. The upstream shape is passed through untouched,
/// so anything without a `results` array is printed as JSON.
fn render(query: &str, body: &Value) -> String {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return format!("{body:#}\n");
    };

    let mut out = String::new();
    let total = body
        .get("total_results")
        .and_then(Value::as_u64)
        .unwrap_or(results.len() as u64);
    let _ = writeln!(out, "{total} result(s) for {query:?}");
    let _ = writeln!(out, "{}", "-".repeat(60));

    for (i, item) in results.iter().enumerate() {
        let title = field(item, &["title", "episode_title"]).unwrap_or("(untitled)");
        let _ = write!(out, "{:>2}. {title}", i + 1);
        if let Some(podcast) = field(item, &["podcast_name", "podcast"]) {
            let _ = write!(out, "  [{podcast}]");
        }
        if let Some(score) = item.get("relevance_score").and_then(Value::as_f64) {
            let _ = write!(out, "  {score:.2}");
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use axum::{routing::post, Json, Router};
    use pi_core::data_mode::DataMode;
    use serde_json::json;

    use super::*;
    use crate::commands::test_support::serve;

    #[test]
    fn render_results() {
        let body = json!({
            "results": [
                { "title": "AI Agents", "podcast_name": "a16z", "relevance_score": 0.91 },
                { "episode_title": "DePIN" }
            ],
            "total_results": 7
        });
        let text = render("agents", &body);
        assert!(text.starts_with("7 result(s) for \"agents\""));
        assert!(text.contains(" 1. AI Agents  [a16z]  0.91"));
        assert!(text.contains(" 2. DePIN"));
    }

    #[test]
    fn render_unknown_shape_as_json() {
        let body = json!({ "hits": 3 });
        assert!(render("x", &body).contains("\"hits\": 3"));
    }

    #[tokio::test]
    async fn timeout_is_reported_distinctly() {
        let app = Router::new().route(
            "/api/search",
            post(|| async {
                (
                    axum::http::StatusCode::GATEWAY_TIMEOUT,
                    Json(json!({ "error": "Search request timed out after 40 seconds" })),
                )
            }),
        );
        let base = serve(app).await;
        let ctx = CommandContext::new(&base, "http://127.0.0.1:9", DataMode::Live, false);

        let err = run(&ctx, "slow".into(), 10, 0).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("timed out after 40 seconds"));
        assert!(text.contains("narrower query"));
    }

    #[tokio::test]
    async fn search_succeeds() {
        let app = Router::new().route(
            "/api/search",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "results": [{ "title": body["query"] }], "total_results": 1 }))
            }),
        );
        let base = serve(app).await;
        let ctx = CommandContext::new(&base, "http://127.0.0.1:9", DataMode::Live, true);
        assert!(run(&ctx, "depin".into(), 5, 0).await.is_ok());
    }
}
