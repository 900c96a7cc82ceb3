//! Dashboard aggregation.
//!
//! One discovery call, then up to [`MAX_DASHBOARD_EPISODES`] brief calls in
//! parallel. A failed brief only drops that episode; a failed discovery
//! fails the whole request.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde_json::Value;

use pi_api_types::{DashboardResponse, DiscoveredEpisode, EpisodeBrief, RawBrief, Signal};
use pi_upstream::{IntelligenceApi, UpstreamError};

use crate::api_error::ApiError;
use crate::http_api::ApiState;

pub const MAX_DASHBOARD_EPISODES: usize = 8;

pub const UNKNOWN_PODCAST: &str = "Unknown Podcast";
pub const DEFAULT_RELEVANCE: f64 = 0.5;

/// Discover episodes, fetch their briefs concurrently and assemble the
/// dashboard. Brief order follows discovery order.
pub async fn build_dashboard(
    api: &dyn IntelligenceApi,
    now: DateTime<Utc>,
) -> Result<DashboardResponse, UpstreamError> {
    let discovered = api.find_episodes_with_intelligence().await?;
    let selected: Vec<DiscoveredEpisode> = discovered
        .into_iter()
        .take(MAX_DASHBOARD_EPISODES)
        .collect();

    if selected.is_empty() {
        tracing::info!("discovery returned no episodes");
        return Ok(DashboardResponse::empty(now));
    }

    let results = join_all(
        selected
            .iter()
            .map(|episode| api.episode_brief(&episode.episode_id)),
    )
    .await;

    let mut episodes = Vec::with_capacity(selected.len());
    for (episode, result) in selected.iter().zip(results) {
        match result {
            Ok(raw) => episodes.push(normalize_brief(raw, episode, now)),
            Err(e) => {
                tracing::warn!(episode_id = %episode.episode_id, error = %e, "skipping episode brief");
            }
        }
    }

    tracing::debug!(
        requested = selected.len(),
        returned = episodes.len(),
        "dashboard assembled"
    );
    Ok(DashboardResponse::from_episodes(episodes, now))
}

/// Fill every missing brief field, preferring what discovery already told
/// us over the fixed defaults.
pub fn normalize_brief(
    raw: RawBrief,
    discovered: &DiscoveredEpisode,
    now: DateTime<Utc>,
) -> EpisodeBrief {
    EpisodeBrief {
        episode_id: raw
            .episode_id
            .unwrap_or_else(|| discovered.episode_id.clone()),
        title: raw
            .title
            .or_else(|| discovered.title.clone())
            .unwrap_or_default(),
        podcast_name: raw
            .podcast_name
            .or_else(|| discovered.podcast_name.clone())
            .unwrap_or_else(|| UNKNOWN_PODCAST.to_string()),
        published_at: raw
            .published_at
            .or_else(|| discovered.published_at.clone())
            .unwrap_or_else(|| now.to_rfc3339()),
        duration_seconds: raw.duration_seconds.unwrap_or(0),
        relevance_score: clamp_unit(raw.relevance_score.unwrap_or(DEFAULT_RELEVANCE)),
        signals: raw
            .signals
            .unwrap_or_default()
            .into_iter()
            .filter_map(parse_signal)
            .collect(),
        summary: raw.summary.unwrap_or_default(),
        key_insights: raw.key_insights.unwrap_or_default(),
        audio_url: raw.audio_url.unwrap_or_default(),
    }
}

fn parse_signal(value: Value) -> Option<Signal> {
    match serde_json::from_value::<Signal>(value) {
        Ok(mut signal) => {
            signal.confidence = clamp_unit(signal.confidence);
            Some(signal)
        }
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed signal");
            None
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// GET /api/intelligence/dashboard-proxy
pub(crate) async fn dashboard_proxy(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    match build_dashboard(state.api.as_ref(), Utc::now()).await {
        Ok(resp) => Ok(Json(resp)),
        Err(e) => {
            tracing::error!(error = %e, "episode discovery failed");
            Err(ApiError::Upstream {
                error: "Failed to fetch dashboard data".to_string(),
                details: e.details(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
