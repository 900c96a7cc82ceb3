//! Scripted [`IntelligenceApi`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use pi_api_types::{
    AnalyticsQuery, DiscoveredEpisode, RawBrief, SearchRequest, SentimentPoint, ShareRequest,
    SignalsQuery, TopicVelocityResponse,
};

use crate::client::{IntelligenceApi, UpstreamError};

/// Every call the mock received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Discovery,
    Brief(String),
    Search(SearchRequest),
    TopicVelocity(AnalyticsQuery),
    Sentiment(AnalyticsQuery),
    Signals(SignalsQuery),
    Share(ShareRequest),
}

/// A mock upstream for testing.
///
/// Briefs are looked up by episode id; an id with nothing configured answers
/// `404 Not Found`. Analytics responses are queued and popped one per call,
/// falling back to an empty payload once the queue runs dry.
pub struct MockIntelligenceApi {
    discovery: Mutex<Result<Vec<DiscoveredEpisode>, UpstreamError>>,
    briefs: Mutex<HashMap<String, Result<RawBrief, UpstreamError>>>,
    brief_delay: Mutex<Option<Duration>>,
    search: Mutex<Result<Value, UpstreamError>>,
    search_delay: Mutex<Option<Duration>>,
    velocity: Mutex<VecDeque<Result<TopicVelocityResponse, UpstreamError>>>,
    sentiment: Mutex<VecDeque<Result<Vec<SentimentPoint>, UpstreamError>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    briefs_in_flight: AtomicUsize,
    max_briefs_in_flight: AtomicUsize,
}

impl MockIntelligenceApi {
    pub fn new() -> Self {
        Self {
            discovery: Mutex::new(Ok(Vec::new())),
            briefs: Mutex::new(HashMap::new()),
            brief_delay: Mutex::new(None),
            search: Mutex::new(Ok(json!({ "results": [], "total_results": 0 }))),
            search_delay: Mutex::new(None),
            velocity: Mutex::new(VecDeque::new()),
            sentiment: Mutex::new(VecDeque::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            briefs_in_flight: AtomicUsize::new(0),
            max_briefs_in_flight: AtomicUsize::new(0),
        }
    }

    /// Discovery answers with these episodes.
    pub fn with_episodes(self, episodes: Vec<DiscoveredEpisode>) -> Self {
        *self.discovery.lock().unwrap() = Ok(episodes);
        self
    }

    pub fn with_discovery_error(self, error: UpstreamError) -> Self {
        *self.discovery.lock().unwrap() = Err(error);
        self
    }

    pub fn with_brief(self, episode_id: &str, brief: RawBrief) -> Self {
        self.briefs
            .lock()
            .unwrap()
            .insert(episode_id.to_string(), Ok(brief));
        self
    }

    pub fn with_brief_error(self, episode_id: &str, error: UpstreamError) -> Self {
        self.briefs
            .lock()
            .unwrap()
            .insert(episode_id.to_string(), Err(error));
        self
    }

    /// Every brief call sleeps this long before answering.
    pub fn with_brief_delay(self, delay: Duration) -> Self {
        *self.brief_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_search_response(self, response: Value) -> Self {
        *self.search.lock().unwrap() = Ok(response);
        self
    }

    pub fn with_search_error(self, error: UpstreamError) -> Self {
        *self.search.lock().unwrap() = Err(error);
        self
    }

    /// Search sleeps this long before answering.
    pub fn with_search_delay(self, delay: Duration) -> Self {
        *self.search_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Queue a topic velocity answer.
    pub fn with_topic_velocity(self, response: Result<TopicVelocityResponse, UpstreamError>) -> Self {
        self.velocity.lock().unwrap().push_back(response);
        self
    }

    /// Queue a sentiment answer.
    pub fn with_sentiment(self, response: Result<Vec<SentimentPoint>, UpstreamError>) -> Self {
        self.sentiment.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Episode ids passed to `episode_brief`, in arrival order.
    pub fn brief_requests(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Brief(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Number of calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Highest number of brief calls that were running at the same time.
    pub fn max_concurrent_briefs(&self) -> usize {
        self.max_briefs_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockIntelligenceApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntelligenceApi for MockIntelligenceApi {
    async fn find_episodes_with_intelligence(
        &self,
    ) -> Result<Vec<DiscoveredEpisode>, UpstreamError> {
        self.record(MockCall::Discovery);
        self.discovery.lock().unwrap().clone()
    }

    async fn episode_brief(&self, episode_id: &str) -> Result<RawBrief, UpstreamError> {
        self.record(MockCall::Brief(episode_id.to_string()));

        let now = self.briefs_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_briefs_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.brief_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.briefs_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.briefs
            .lock()
            .unwrap()
            .get(episode_id)
            .cloned()
            .unwrap_or(Err(UpstreamError::Status {
                status: 404,
                status_text: "Not Found".into(),
            }))
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, UpstreamError> {
        self.record(MockCall::Search(request.clone()));
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.search.lock().unwrap().clone()
    }

    async fn topic_velocity(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<TopicVelocityResponse, UpstreamError> {
        self.record(MockCall::TopicVelocity(query.clone()));
        self.velocity
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TopicVelocityResponse::default()))
    }

    async fn sentiment_analysis(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<Vec<SentimentPoint>, UpstreamError> {
        self.record(MockCall::Sentiment(query.clone()));
        self.sentiment
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn signals(&self, query: &SignalsQuery) -> Result<Value, UpstreamError> {
        self.record(MockCall::Signals(query.clone()));
        Ok(json!({ "signals": [] }))
    }

    async fn share(&self, request: &ShareRequest) -> Result<Value, UpstreamError> {
        self.record(MockCall::Share(request.clone()));
        Ok(json!({ "success": true }))
    }
}
