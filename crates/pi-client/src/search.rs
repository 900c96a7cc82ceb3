//! Search through the backend with a short-lived client-side cache.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;

use pi_api_types::SearchRequest;
use pi_core::config::SearchConfig;
use pi_core::search_cache::SearchCache;

use crate::bff::BffClient;
use crate::error::SearchError;

/// Repeated searches for the same (normalized) query, limit and offset are
/// answered from the cache until the entry ages out. Failures are never
/// cached.
pub struct SearchClient {
    bff: BffClient,
    cache: Mutex<SearchCache<Value>>,
}

impl SearchClient {
    pub fn new(bff: BffClient) -> Self {
        Self {
            bff,
            cache: Mutex::new(SearchCache::new()),
        }
    }

    pub fn with_cache_limits(bff: BffClient, ttl: Duration, capacity: usize) -> Self {
        Self {
            bff,
            cache: Mutex::new(SearchCache::with_limits(ttl, capacity)),
        }
    }

    pub fn from_config(bff: BffClient, config: &SearchConfig) -> Self {
        Self::with_cache_limits(
            bff,
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        )
    }

    fn cache(&self) -> MutexGuard<'_, SearchCache<Value>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let cached = self
            .cache()
            .get(&request.query, request.limit, request.offset);
        if let Some(hit) = cached {
            tracing::debug!(query = %request.query, "search cache hit");
            return Ok(hit);
        }

        match self.bff.search(request).await {
            Ok(body) => {
                self.cache()
                    .set(&request.query, request.limit, request.offset, body.clone());
                Ok(body)
            }
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!(query = %request.query, "search timed out");
                }
                Err(e)
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache().len()
    }
}
