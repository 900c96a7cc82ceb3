//! Typed access to the upstream intelligence API.
//!
//! [`IntelligenceApi`] is the seam every consumer talks to; the HTTP
//! implementation lives here and a scripted stand-in lives in
//! [`crate::mock`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use pi_api_types::{
    AnalyticsQuery, DiscoveredEpisode, RawBrief, SearchRequest,
    SentimentPayload, SentimentPoint, ShareRequest, SignalsQuery, TopicVelocityResponse,
};
use pi_core::config::UpstreamConfig;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when talking to the upstream service.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Connection failure, DNS, TLS, malformed URL, etc.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The API answered with a non-success status.
    #[error("upstream returned {status}: {status_text}")]
    Status { status: u16, status_text: String },

    /// Failed to parse the response body.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,
}

impl UpstreamError {
    /// Short human-readable cause, used as the `details` of error payloads.
    pub fn details(&self) -> String {
        match self {
            UpstreamError::Status { status_text, .. } => status_text.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::ParseError(err.to_string())
        } else {
            UpstreamError::HttpError(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// IntelligenceApi trait
// ---------------------------------------------------------------------------

/// Async access to the upstream intelligence endpoints.
#[async_trait]
pub trait IntelligenceApi: Send + Sync {
    /// `GET /api/intelligence/find-episodes-with-intelligence`
    async fn find_episodes_with_intelligence(
        &self,
    ) -> Result<Vec<DiscoveredEpisode>, UpstreamError>;

    /// `GET /api/intelligence/brief/{id}`
    async fn episode_brief(&self, episode_id: &str) -> Result<RawBrief, UpstreamError>;

    /// `POST /api/search`. The body is forwarded as-is and the answer is
    /// returned untouched. Implementations apply no timeout of their own;
    /// callers bound the call.
    async fn search(&self, request: &SearchRequest) -> Result<Value, UpstreamError>;

    /// `GET /api/topic-velocity`
    async fn topic_velocity(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<TopicVelocityResponse, UpstreamError>;

    /// `GET /api/sentiment_analysis_v2`
    async fn sentiment_analysis(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<Vec<SentimentPoint>, UpstreamError>;

    /// `GET /api/signals`
    async fn signals(&self, query: &SignalsQuery) -> Result<Value, UpstreamError>;

    /// `POST /api/intelligence/share`
    async fn share(&self, request: &ShareRequest) -> Result<Value, UpstreamError>;
}

// ---------------------------------------------------------------------------
// HttpIntelligenceClient
// ---------------------------------------------------------------------------

/// The discovery endpoint has been seen answering both with a bare list and
/// with an `{ "episodes": [...] }` envelope. Entries are decoded one by one.
#[derive(Deserialize)]
#[serde(untagged)]
enum DiscoveryPayload {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default)]
        episodes: Vec<Value>,
    },
}

impl DiscoveryPayload {
    /// Entries without a usable id are logged and skipped.
    fn into_episodes(self) -> Vec<DiscoveredEpisode> {
        let (DiscoveryPayload::Bare(entries) | DiscoveryPayload::Wrapped { episodes: entries }) =
            self;
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                match serde_json::from_value::<DiscoveredEpisode>(entry) {
                    Ok(episode) => Some(episode),
                    Err(e) => {
                        tracing::warn!(index, error = %e, "skipping malformed discovery entry");
                        None
                    }
                }
            })
            .collect()
    }
}

/// [`IntelligenceApi`] over HTTP/JSON.
///
/// No auth header is sent; the upstream does not require one yet.
#[derive(Clone)]
pub struct HttpIntelligenceClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpIntelligenceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(&config.base_url)
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    /// Timeout applied to every call except [`IntelligenceApi::search`].
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base_url}/seg/seg/...`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, UpstreamError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| UpstreamError::HttpError(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::HttpError("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "upstream GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, UpstreamError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "upstream POST");
        let mut req = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        Self::decode(req.send().await?).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, UpstreamError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("Unknown Status")
                    .to_string(),
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| UpstreamError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl IntelligenceApi for HttpIntelligenceClient {
    async fn find_episodes_with_intelligence(
        &self,
    ) -> Result<Vec<DiscoveredEpisode>, UpstreamError> {
        let payload: DiscoveryPayload = self
            .get_json(&["api", "intelligence", "find-episodes-with-intelligence"], &[])
            .await?;
        Ok(payload.into_episodes())
    }

    async fn episode_brief(&self, episode_id: &str) -> Result<RawBrief, UpstreamError> {
        self.get_json(&["api", "intelligence", "brief", episode_id], &[])
            .await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, UpstreamError> {
        self.post_json(&["api", "search"], request, None).await
    }

    async fn topic_velocity(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<TopicVelocityResponse, UpstreamError> {
        self.get_json(&["api", "topic-velocity"], &query.to_query_pairs())
            .await
    }

    async fn sentiment_analysis(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<Vec<SentimentPoint>, UpstreamError> {
        let payload: SentimentPayload = self
            .get_json(&["api", "sentiment_analysis_v2"], &query.to_query_pairs())
            .await?;
        Ok(payload.into_points())
    }

    async fn signals(&self, query: &SignalsQuery) -> Result<Value, UpstreamError> {
        self.get_json(&["api", "signals"], &query.to_query_pairs())
            .await
    }

    async fn share(&self, request: &ShareRequest) -> Result<Value, UpstreamError> {
        self.post_json(
            &["api", "intelligence", "share"],
            request,
            Some(self.request_timeout),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_and_encodes_segments() {
        let client = HttpIntelligenceClient::new("https://intel.example.com/");
        let url = client
            .endpoint(&["api", "intelligence", "brief", "ep 1/2"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://intel.example.com/api/intelligence/brief/ep%201%2F2"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = HttpIntelligenceClient::new("https://example.com/intel");
        let url = client.endpoint(&["api", "signals"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/intel/api/signals");
    }

    #[test]
    fn invalid_base_url_is_http_error() {
        let client = HttpIntelligenceClient::new("not a url");
        assert!(matches!(
            client.endpoint(&["api"]),
            Err(UpstreamError::HttpError(_))
        ));
    }

    #[test]
    fn details_prefers_status_text() {
        let err = UpstreamError::Status {
            status: 503,
            status_text: "Service Unavailable".into(),
        };
        assert_eq!(err.details(), "Service Unavailable");
        assert_eq!(UpstreamError::Timeout.details(), "request timed out");
    }

    fn ids(payload: &str) -> Vec<String> {
        serde_json::from_str::<DiscoveryPayload>(payload)
            .unwrap()
            .into_episodes()
            .into_iter()
            .map(|e| e.episode_id)
            .collect()
    }

    #[test]
    fn discovery_payload_accepts_both_shapes() {
        assert_eq!(ids(r#"[{"episode_id": "a"}, {"id": "b"}]"#), vec!["a", "b"]);
        assert_eq!(
            ids(r#"{"episodes": [{"episode_id": "a"}], "total": 1}"#),
            vec!["a"]
        );
        assert!(ids(r#"{"total": 0}"#).is_empty());
    }

    #[test]
    fn discovery_skips_entries_without_id() {
        assert_eq!(
            ids(r#"[{"episode_id": "a"}, {"title": "no id"}, 7, {"id": "c"}]"#),
            vec!["a", "c"]
        );
    }
}
