//! Shared wire types for podintel services.
//!
//! These records mirror the JSON exchanged with the upstream intelligence
//! API and with dashboard consumers. Every fetch path (live or demo) resolves
//! to one of these types, so consumers never need to know where the data
//! came from.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Signals ──

/// Classification of an extracted insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Investable,
    Competitive,
    Portfolio,
    SoundBite,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Investable => "investable",
            SignalType::Competitive => "competitive",
            SignalType::Portfolio => "portfolio",
            SignalType::SoundBite => "sound_bite",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, confidence-scored insight owned by an [`EpisodeBrief`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub content: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

// ── Episode briefs ──

/// A single episode's intelligence summary plus its signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeBrief {
    pub episode_id: String,
    pub title: String,
    pub podcast_name: String,
    /// ISO-8601 timestamp as reported upstream.
    pub published_at: String,
    pub duration_seconds: u64,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub audio_url: String,
}

/// Brief as returned by `GET /api/intelligence/brief/{id}`.
///
/// Every field is optional upstream; the dashboard proxy fills the gaps.
/// Signals stay as raw JSON and the numeric and list fields are read
/// leniently, so one malformed part cannot sink the brief.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBrief {
    #[serde(default, alias = "id")]
    pub episode_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub podcast_name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub duration_seconds: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub signals: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_strings")]
    pub key_insights: Option<Vec<String>>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Field readers that map wrong-typed values to `None` instead of failing.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Any non-negative number; floats are truncated.
    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            }),
            _ => None,
        })
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            _ => None,
        })
    }

    /// String entries of an array; anything else in it is skipped.
    pub fn opt_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
    }
}

// ── Discovery ──

/// One entry of `GET /api/intelligence/find-episodes-with-intelligence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredEpisode {
    #[serde(alias = "id")]
    pub episode_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub podcast_name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl DiscoveredEpisode {
    pub fn new(episode_id: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            title: None,
            podcast_name: None,
            published_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

// ── Dashboard ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub episodes: Vec<EpisodeBrief>,
    pub total_episodes: usize,
    pub generated_at: DateTime<Utc>,
}

impl DashboardResponse {
    /// Build a response whose `total_episodes` always matches `episodes.len()`.
    pub fn from_episodes(episodes: Vec<EpisodeBrief>, generated_at: DateTime<Utc>) -> Self {
        Self {
            total_episodes: episodes.len(),
            episodes,
            generated_at,
        }
    }

    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self::from_episodes(Vec::new(), generated_at)
    }
}

// ── Topic velocity ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMentions {
    pub week: String,
    pub mentions: u64,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicVelocityMetadata {
    #[serde(default)]
    pub total_episodes: u64,
    #[serde(default)]
    pub date_range: String,
    #[serde(default)]
    pub data_completeness: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicVelocityResponse {
    /// Topic name → weekly series, oldest week first.
    #[serde(default)]
    pub data: BTreeMap<String, Vec<WeeklyMentions>>,
    #[serde(default)]
    pub metadata: TopicVelocityMetadata,
}

// ── Sentiment ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub topic: String,
    pub week: String,
    /// Sentiment in `[-1, 1]`.
    pub sentiment: f64,
    #[serde(rename = "episodeCount", default)]
    pub episode_count: u64,
}

/// `sentiment_analysis_v2` answers either with a bare array or wrapped in
/// `{ "data": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SentimentPayload {
    Bare(Vec<SentimentPoint>),
    Wrapped { data: Vec<SentimentPoint> },
}

impl SentimentPayload {
    pub fn into_points(self) -> Vec<SentimentPoint> {
        match self {
            SentimentPayload::Bare(points) => points,
            SentimentPayload::Wrapped { data } => data,
        }
    }
}

// ── Request shapes ──

fn default_limit() -> u32 {
    10
}

fn default_weeks() -> u32 {
    12
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Upper bound on the analytics window (ten years of weeks).
pub const MAX_ANALYTICS_WEEKS: u32 = 520;

/// Query parameters shared by the topic-velocity and sentiment endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default = "default_weeks")]
    pub weeks: u32,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl AnalyticsQuery {
    /// `weeks` clamped to `1..=MAX_ANALYTICS_WEEKS`.
    pub fn span_weeks(&self) -> u32 {
        self.weeks.clamp(1, MAX_ANALYTICS_WEEKS)
    }

    /// Render as URL query pairs; topics are comma-joined.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("weeks", self.span_weeks().to_string())];
        if !self.topics.is_empty() {
            pairs.push(("topics", self.topics.join(",")));
        }
        pairs
    }
}

impl Default for AnalyticsQuery {
    fn default() -> Self {
        Self {
            weeks: default_weeks(),
            topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_type: Option<SignalType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SignalsQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(t) = self.signal_type {
            pairs.push(("signal_type", t.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePlatform {
    Email,
    Slack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub episode_id: String,
    pub platform: SharePlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_summary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_note: Option<String>,
}
