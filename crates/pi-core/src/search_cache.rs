//! Short-lived cache for repeated search queries.
//!
//! Keys are normalized (trimmed, lower-cased query plus limit and offset) so
//! `"Foo"` and `"foo "` share an entry. Expiry is lazy: a stale entry is only
//! noticed, and dropped, when it is read. Once the cache grows past its
//! capacity exactly one entry is evicted, the one inserted earliest.
//!
//! The cache itself is not synchronized. Callers sharing it across tasks wrap
//! it in a mutex held for the whole get or set call.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ahash::AHashMap;

pub const SEARCH_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const SEARCH_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchCacheKey {
    query: String,
    limit: u32,
    offset: u32,
}

impl SearchCacheKey {
    pub fn new(query: &str, limit: u32, offset: u32) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            limit,
            offset,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    timestamp: Instant,
}

#[derive(Debug)]
pub struct SearchCache<T> {
    entries: AHashMap<SearchCacheKey, CacheEntry<T>>,
    /// Keys in first-insertion order; overwrites keep their slot.
    order: VecDeque<SearchCacheKey>,
    ttl: Duration,
    capacity: usize,
}

impl<T: Clone> SearchCache<T> {
    pub fn new() -> Self {
        Self::with_limits(SEARCH_CACHE_TTL, SEARCH_CACHE_CAPACITY)
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            order: VecDeque::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&mut self, query: &str, limit: u32, offset: u32) -> Option<T> {
        self.get_at(query, limit, offset, Instant::now())
    }

    /// Same as [`get`](Self::get) with an explicit notion of "now".
    pub fn get_at(&mut self, query: &str, limit: u32, offset: u32, now: Instant) -> Option<T> {
        let key = SearchCacheKey::new(query, limit, offset);
        let entry = self.entries.get(&key)?;

        if now.saturating_duration_since(entry.timestamp) < self.ttl {
            return Some(entry.data.clone());
        }

        tracing::debug!(query = %key.query, "search cache entry expired");
        self.remove(&key);
        None
    }

    pub fn set(&mut self, query: &str, limit: u32, offset: u32, data: T) {
        self.set_at(query, limit, offset, data, Instant::now());
    }

    pub fn set_at(&mut self, query: &str, limit: u32, offset: u32, data: T, now: Instant) {
        let key = SearchCacheKey::new(query, limit, offset);
        let entry = CacheEntry {
            data,
            timestamp: now,
        };

        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push_back(key);
        }

        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, query: &str, limit: u32, offset: u32) -> bool {
        self.entries
            .contains_key(&SearchCacheKey::new(query, limit, offset))
    }

    fn remove(&mut self, key: &SearchCacheKey) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

impl<T: Clone> Default for SearchCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalizes_case_and_whitespace() {
        assert_eq!(
            SearchCacheKey::new("  AI Agents ", 10, 0),
            SearchCacheKey::new("ai agents", 10, 0)
        );
        assert_ne!(
            SearchCacheKey::new("ai", 10, 0),
            SearchCacheKey::new("ai", 10, 10)
        );
    }

    #[test]
    fn overwrite_keeps_insertion_slot() {
        let mut cache = SearchCache::with_limits(SEARCH_CACHE_TTL, 2);
        cache.set("a", 10, 0, 1);
        cache.set("b", 10, 0, 2);
        cache.set("a", 10, 0, 3);
        assert_eq!(cache.len(), 2);

        cache.set("c", 10, 0, 4);
        // "a" was inserted first, so it goes even though it was rewritten last.
        assert!(!cache.contains("a", 10, 0));
        assert_eq!(cache.get("b", 10, 0), Some(2));
        assert_eq!(cache.get("c", 10, 0), Some(4));
    }

    #[test]
    fn expired_read_drops_order_slot() {
        let start = Instant::now();
        let mut cache = SearchCache::with_limits(Duration::from_secs(1), 2);
        cache.set_at("a", 10, 0, 1, start);
        assert_eq!(cache.get_at("a", 10, 0, start + Duration::from_secs(2)), None);
        assert!(cache.is_empty());
        assert!(cache.order.is_empty());
    }
}
