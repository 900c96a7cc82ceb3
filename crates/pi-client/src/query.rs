//! Keyed, stale-while-revalidate query cache.
//!
//! A [`QueryClient`] stores the last good answer for each [`QueryKey`]
//! together with when it was fetched. Entries are fresh for
//! [`QueryOptions::stale_time`], then kept for another
//! [`QueryOptions::gc_time`] so a revisit can show old data immediately
//! while a refetch runs. Expiry is checked lazily on access.
//!
//! [`QueryClient::observe`] spawns a task that keeps a [`QueryHandle`]'s
//! state up to date: an initial fetch when nothing fresh is cached, then
//! refetches on the configured interval or on demand.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ahash::AHashMap;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use pi_core::data_mode::DataMode;

use crate::error::ClientError;

// ---------------------------------------------------------------------------
// Keys and options
// ---------------------------------------------------------------------------

/// Identity of a cached query. The data mode is part of the key, so live
/// and demo answers for the same resource never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: &'static str,
    mode: DataMode,
    params: String,
}

impl QueryKey {
    pub fn new(resource: &'static str, mode: DataMode, params: impl Into<String>) -> Self {
        Self {
            resource,
            mode,
            params: params.into(),
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.resource, self.mode)?;
        if !self.params.is_empty() {
            write!(f, "?{}", self.params)?;
        }
        Ok(())
    }
}

/// Exponential backoff: attempt `n` (0-based) waits
/// `min(base_delay * 2^n, max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a fetched answer counts as fresh.
    pub stale_time: Duration,
    /// How long a stale answer is kept around after going stale.
    pub gc_time: Duration,
    /// Periodic refetch for observed queries; `None` disables polling.
    pub refetch_interval: Option<Duration>,
    pub retry: RetryPolicy,
}

impl QueryOptions {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time,
            refetch_interval: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_refetch_interval(mut self, interval: Option<Duration>) -> Self {
        self.refetch_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::from_secs(5 * 60))
    }
}

// ---------------------------------------------------------------------------
// Query state
// ---------------------------------------------------------------------------

/// What an observer sees. After a failed refetch `data` still holds the
/// previous answer, if there was one, alongside the error.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    /// No data yet and a fetch is running.
    pub is_loading: bool,
    /// Any fetch is running, including background refetches.
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<ClientError>,
    /// Attempts made by the last failed fetch cycle.
    pub failure_count: u32,
    /// Completed fetch cycles, successful or not.
    pub fetch_count: u64,
    pub updated_at: Option<Instant>,
}

impl<T> QueryState<T> {
    pub fn is_success(&self) -> bool {
        self.data.is_some() && !self.is_error
    }

    fn is_settled(&self) -> bool {
        !self.is_loading && !self.is_fetching
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: true,
            is_fetching: false,
            is_error: false,
            error: None,
            failure_count: 0,
            fetch_count: 0,
            updated_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// QueryClient
// ---------------------------------------------------------------------------

struct Entry {
    data: Arc<dyn Any + Send + Sync>,
    updated_at: Instant,
    stale_time: Duration,
    gc_time: Duration,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        !self.invalidated && now.saturating_duration_since(self.updated_at) < self.stale_time
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.updated_at) >= self.stale_time + self.gc_time
    }
}

/// Shared query cache. Cloning shares the same entries.
#[derive(Clone, Default)]
pub struct QueryClient {
    entries: Arc<Mutex<AHashMap<QueryKey, Entry>>>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached data, fresh or stale, unless retention has run out. Returns
    /// the data, whether it is fresh, and when it was fetched.
    fn lookup<T>(&self, key: &QueryKey, now: Instant) -> Option<(T, bool, Instant)>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut entries = self.lock();
        if entries.get(key)?.is_expired(now) {
            tracing::debug!(query = %key, "query cache entry expired");
            entries.remove(key);
            return None;
        }
        let entry = entries.get(key)?;
        let data = entry.data.downcast_ref::<T>()?.clone();
        Some((data, entry.is_fresh(now), entry.updated_at))
    }

    pub fn get_query_data<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.lookup(key, Instant::now()).map(|(data, _, _)| data)
    }

    /// Store `data` under `key`, returning the fetch timestamp recorded.
    pub fn set_query_data<T>(&self, key: QueryKey, data: T, options: &QueryOptions) -> Instant
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        self.lock().insert(
            key,
            Entry {
                data: Arc::new(data),
                updated_at: now,
                stale_time: options.stale_time,
                gc_time: options.gc_time,
                invalidated: false,
            },
        );
        now
    }

    /// Mark an entry stale so the next fetch goes to the source. The data
    /// stays available until retention runs out.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.lock().get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Fresh cached data if there is any, otherwise fetch (with retries)
    /// and cache the result.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<T, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some((data, true, _)) = self.lookup::<T>(key, Instant::now()) {
            tracing::debug!(query = %key, "query cache hit");
            return Ok(data);
        }
        self.refetch_query(key, options, fetcher).await
    }

    /// Fetch (with retries) regardless of freshness and cache the result.
    pub async fn refetch_query<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<T, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let data = run_with_retry(key, &options.retry, &fetcher)
            .await
            .map_err(|(e, _)| e)?;
        self.set_query_data(key.clone(), data.clone(), options);
        Ok(data)
    }

    /// Keep a live view of `key`. The returned handle's state starts from
    /// whatever is cached; a fetch runs at once unless that data is fresh.
    /// Dropping the handle stops the background task.
    pub fn observe<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetcher: F) -> QueryHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let cached = self.lookup::<T>(&key, Instant::now());
        let mut initial = QueryState::default();
        let mut skip_first_fetch = false;
        if let Some((data, fresh, updated_at)) = cached {
            initial.data = Some(data);
            initial.is_loading = false;
            initial.updated_at = Some(updated_at);
            skip_first_fetch = fresh;
        }

        let (tx, rx) = watch::channel(initial);
        let refetch = Arc::new(Notify::new());

        let client = self.clone();
        let notify = refetch.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let key = task_key;
            let mut skip = skip_first_fetch;
            loop {
                if !skip {
                    tx.send_modify(|s| {
                        s.is_fetching = true;
                        s.is_loading = s.data.is_none();
                    });
                    match run_with_retry(&key, &options.retry, &fetcher).await {
                        Ok(data) => {
                            let at = client.set_query_data(key.clone(), data.clone(), &options);
                            tx.send_modify(|s| {
                                s.data = Some(data);
                                s.is_loading = false;
                                s.is_fetching = false;
                                s.is_error = false;
                                s.error = None;
                                s.failure_count = 0;
                                s.fetch_count += 1;
                                s.updated_at = Some(at);
                            });
                        }
                        Err((e, failures)) => {
                            tracing::error!(query = %key, error = %e, failures, "query failed");
                            tx.send_modify(|s| {
                                s.is_loading = false;
                                s.is_fetching = false;
                                s.is_error = true;
                                s.error = Some(e);
                                s.failure_count = failures;
                                s.fetch_count += 1;
                            });
                        }
                    }
                }
                skip = false;

                let tick = async {
                    match options.refetch_interval {
                        Some(interval) => tokio::time::sleep(interval).await,
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    _ = tick => tracing::debug!(query = %key, "interval refetch"),
                    _ = notify.notified() => tracing::debug!(query = %key, "manual refetch"),
                    _ = tx.closed() => break,
                }
            }
        });

        QueryHandle {
            key,
            rx,
            refetch,
            task,
        }
    }
}

async fn run_with_retry<T, F, Fut>(
    key: &QueryKey,
    retry: &RetryPolicy,
    fetcher: &F,
) -> Result<T, (ClientError, u32)>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(data) => return Ok(data),
            Err(e) if attempt < retry.max_retries => {
                let delay = retry.delay_for(attempt);
                tracing::warn!(
                    query = %key,
                    attempt = attempt + 1,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "query failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err((e, attempt + 1)),
        }
    }
}

// ---------------------------------------------------------------------------
// QueryHandle
// ---------------------------------------------------------------------------

/// Live view of one observed query. Dropping it stops polling.
pub struct QueryHandle<T> {
    key: QueryKey,
    rx: watch::Receiver<QueryState<T>>,
    refetch: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T: Clone> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.rx.borrow().data.clone()
    }

    /// Ask the background task to refetch now.
    pub fn refetch(&self) {
        self.refetch.notify_one();
    }

    /// Wait for the next state change.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until nothing is loading or fetching.
    pub async fn settled(&mut self) -> QueryState<T> {
        let result = self.rx.wait_for(|s| s.is_settled()).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Wait until at least `count` fetch cycles have completed.
    pub async fn wait_for_fetches(&mut self, count: u64) -> QueryState<T> {
        let result = self
            .rx
            .wait_for(|s| s.fetch_count >= count && s.is_settled())
            .await
            .map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.rx.clone()
    }
}

impl<T> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key(mode: DataMode) -> QueryKey {
        QueryKey::new("widgets", mode, "page=1")
    }

    fn opts() -> QueryOptions {
        QueryOptions::new(Duration::from_secs(60), Duration::from_secs(300))
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay_for(0), Duration::from_secs(1));
        assert_eq!(retry.delay_for(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for(2), Duration::from_secs(4));
        assert_eq!(retry.delay_for(5), Duration::from_secs(30));
        assert_eq!(retry.delay_for(40), Duration::from_secs(30));
    }

    #[test]
    fn key_display_and_mode() {
        let k = key(DataMode::Demo);
        assert_eq!(k.to_string(), "widgets[demo]?page=1");
        assert_ne!(key(DataMode::Live), key(DataMode::Demo));
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_hit_skips_fetcher() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicU32::new(0));
        let fetch = || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ClientError>(7u32)
            }
        };

        assert_eq!(client.fetch_query(&key(DataMode::Live), &opts(), fetch).await.unwrap(), 7);
        assert_eq!(client.fetch_query(&key(DataMode::Live), &opts(), fetch).await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        client.fetch_query(&key(DataMode::Live), &opts(), fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_data_retained_until_gc_time() {
        let client = QueryClient::new();
        client.set_query_data(key(DataMode::Live), 1u32, &opts());

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(client.get_query_data::<u32>(&key(DataMode::Live)), Some(1));

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(client.get_query_data::<u32>(&key(DataMode::Live)), None);
        assert!(client.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_refetch() {
        let client = QueryClient::new();
        client.set_query_data(key(DataMode::Live), 1u32, &opts());
        assert!(client.invalidate(&key(DataMode::Live)));

        let got = client
            .fetch_query(&key(DataMode::Live), &opts(), || async { Ok(2u32) })
            .await
            .unwrap();
        assert_eq!(got, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_surfaces_error() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let err = client
            .fetch_query(&key(DataMode::Live), &opts(), || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(ClientError::Http("down".into()))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Http(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(7));
        assert!(client.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_type_is_a_miss() {
        let client = QueryClient::new();
        client.set_query_data(key(DataMode::Live), "text".to_string(), &opts());
        assert_eq!(client.get_query_data::<u32>(&key(DataMode::Live)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn observe_keeps_previous_data_on_error() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let options = opts()
            .with_refetch_interval(Some(Duration::from_secs(60)))
            .with_retry(RetryPolicy::none());

        let mut handle = client.observe(key(DataMode::Live), options, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(10u32)
                } else {
                    Err(ClientError::Http("flaky".into()))
                }
            }
        });

        let first = handle.wait_for_fetches(1).await;
        assert_eq!(first.data, Some(10));
        assert!(!first.is_error);

        let second = handle.wait_for_fetches(2).await;
        assert_eq!(second.data, Some(10));
        assert!(second.is_error);
        assert_eq!(second.failure_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn observe_starts_from_fresh_cache_without_fetching() {
        let client = QueryClient::new();
        client.set_query_data(key(DataMode::Demo), 3u32, &opts());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut handle = client.observe(key(DataMode::Demo), opts(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(4u32) }
        });
        let state = handle.settled().await;
        assert_eq!(state.data, Some(3));
        assert!(!state.is_loading);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handle.refetch();
        let state = handle.wait_for_fetches(1).await;
        assert_eq!(state.data, Some(4));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
