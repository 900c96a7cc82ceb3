//! Mode-aware fetch hooks for the dashboard views.
//!
//! Each hook picks its source from the [`DataMode`] it is given: live reads
//! the upstream (or the backend, for the dashboard), demo synthesizes data
//! locally. Both paths produce the same type, and the mode is part of the
//! query key, so switching modes never shows data from the other one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use pi_api_types::{
    AnalyticsQuery, DashboardResponse, SentimentPoint, ShareRequest, SignalsQuery,
    TopicVelocityResponse,
};
use pi_core::data_mode::DataMode;
use pi_core::demo;
use pi_upstream::IntelligenceApi;

use crate::bff::BffClient;
use crate::error::ClientError;
use crate::query::{QueryClient, QueryHandle, QueryKey, QueryOptions};

pub const ANALYTICS_STALE_TIME: Duration = Duration::from_secs(5 * 60);
pub const ANALYTICS_GC_TIME: Duration = Duration::from_secs(10 * 60);
pub const ANALYTICS_REFETCH_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DASHBOARD_STALE_TIME: Duration = Duration::from_secs(60);
pub const DASHBOARD_GC_TIME: Duration = Duration::from_secs(5 * 60);
pub const DASHBOARD_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

pub const TOPIC_VELOCITY: &str = "topic-velocity";
pub const SENTIMENT: &str = "sentiment";
pub const DASHBOARD: &str = "dashboard";

// ---------------------------------------------------------------------------
// Keys and options
// ---------------------------------------------------------------------------

/// Demo data never polls.
pub fn analytics_options(mode: DataMode) -> QueryOptions {
    QueryOptions::new(ANALYTICS_STALE_TIME, ANALYTICS_GC_TIME)
        .with_refetch_interval(mode.is_live().then_some(ANALYTICS_REFETCH_INTERVAL))
}

pub fn dashboard_options(mode: DataMode) -> QueryOptions {
    QueryOptions::new(DASHBOARD_STALE_TIME, DASHBOARD_GC_TIME)
        .with_refetch_interval(mode.is_live().then_some(DASHBOARD_REFETCH_INTERVAL))
}

fn analytics_params(query: &AnalyticsQuery) -> String {
    format!("weeks={}&topics={}", query.weeks, query.topics.join(","))
}

pub fn topic_velocity_key(mode: DataMode, query: &AnalyticsQuery) -> QueryKey {
    QueryKey::new(TOPIC_VELOCITY, mode, analytics_params(query))
}

pub fn sentiment_key(mode: DataMode, query: &AnalyticsQuery) -> QueryKey {
    QueryKey::new(SENTIMENT, mode, analytics_params(query))
}

pub fn dashboard_key(mode: DataMode) -> QueryKey {
    QueryKey::new(DASHBOARD, mode, "")
}

// ---------------------------------------------------------------------------
// Fetch functions
// ---------------------------------------------------------------------------

pub async fn fetch_topic_velocity(
    api: &dyn IntelligenceApi,
    mode: DataMode,
    query: &AnalyticsQuery,
) -> Result<TopicVelocityResponse, ClientError> {
    match mode {
        DataMode::Demo => Ok(demo::topic_velocity(query, Utc::now().date_naive())),
        DataMode::Live => Ok(api.topic_velocity(query).await?),
    }
}

pub async fn fetch_sentiment(
    api: &dyn IntelligenceApi,
    mode: DataMode,
    query: &AnalyticsQuery,
) -> Result<Vec<SentimentPoint>, ClientError> {
    match mode {
        DataMode::Demo => Ok(demo::sentiment(query, Utc::now().date_naive())),
        DataMode::Live => Ok(api.sentiment_analysis(query).await?),
    }
}

pub async fn fetch_dashboard(
    bff: &BffClient,
    mode: DataMode,
) -> Result<DashboardResponse, ClientError> {
    match mode {
        DataMode::Demo => Ok(demo::dashboard(Utc::now())),
        DataMode::Live => bff.dashboard().await,
    }
}

// ---------------------------------------------------------------------------
// IntelligenceHooks
// ---------------------------------------------------------------------------

/// Entry point for views: one-shot cached fetches and observed queries.
#[derive(Clone)]
pub struct IntelligenceHooks {
    queries: QueryClient,
    upstream: Arc<dyn IntelligenceApi>,
    bff: BffClient,
}

impl IntelligenceHooks {
    pub fn new(queries: QueryClient, upstream: Arc<dyn IntelligenceApi>, bff: BffClient) -> Self {
        Self {
            queries,
            upstream,
            bff,
        }
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn use_topic_velocity(
        &self,
        mode: DataMode,
        query: AnalyticsQuery,
    ) -> QueryHandle<TopicVelocityResponse> {
        let key = topic_velocity_key(mode, &query);
        let upstream = self.upstream.clone();
        self.queries.observe(key, analytics_options(mode), move || {
            let upstream = upstream.clone();
            let query = query.clone();
            async move { fetch_topic_velocity(upstream.as_ref(), mode, &query).await }
        })
    }

    pub fn use_sentiment(
        &self,
        mode: DataMode,
        query: AnalyticsQuery,
    ) -> QueryHandle<Vec<SentimentPoint>> {
        let key = sentiment_key(mode, &query);
        let upstream = self.upstream.clone();
        self.queries.observe(key, analytics_options(mode), move || {
            let upstream = upstream.clone();
            let query = query.clone();
            async move { fetch_sentiment(upstream.as_ref(), mode, &query).await }
        })
    }

    pub fn use_dashboard(&self, mode: DataMode) -> QueryHandle<DashboardResponse> {
        let bff = self.bff.clone();
        self.queries
            .observe(dashboard_key(mode), dashboard_options(mode), move || {
                let bff = bff.clone();
                async move { fetch_dashboard(&bff, mode).await }
            })
    }

    pub async fn topic_velocity(
        &self,
        mode: DataMode,
        query: &AnalyticsQuery,
    ) -> Result<TopicVelocityResponse, ClientError> {
        let upstream = self.upstream.as_ref();
        self.queries
            .fetch_query(&topic_velocity_key(mode, query), &analytics_options(mode), || {
                fetch_topic_velocity(upstream, mode, query)
            })
            .await
    }

    pub async fn sentiment(
        &self,
        mode: DataMode,
        query: &AnalyticsQuery,
    ) -> Result<Vec<SentimentPoint>, ClientError> {
        let upstream = self.upstream.as_ref();
        self.queries
            .fetch_query(&sentiment_key(mode, query), &analytics_options(mode), || {
                fetch_sentiment(upstream, mode, query)
            })
            .await
    }

    pub async fn dashboard(&self, mode: DataMode) -> Result<DashboardResponse, ClientError> {
        self.queries
            .fetch_query(&dashboard_key(mode), &dashboard_options(mode), || {
                fetch_dashboard(&self.bff, mode)
            })
            .await
    }

    /// Live only; signals have no demo counterpart.
    pub async fn signals(&self, query: &SignalsQuery) -> Result<Value, ClientError> {
        Ok(self.upstream.signals(query).await?)
    }

    /// Live only.
    pub async fn share_episode(&self, request: &ShareRequest) -> Result<Value, ClientError> {
        tracing::info!(episode_id = %request.episode_id, "sharing episode");
        Ok(self.upstream.share(request).await?)
    }
}
