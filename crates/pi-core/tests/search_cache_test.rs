use std::time::{Duration, Instant};

use pi_core::search_cache::{SearchCache, SEARCH_CACHE_CAPACITY, SEARCH_CACHE_TTL};
use serde_json::{json, Value};

#[test]
fn set_then_get_returns_value() {
    let mut cache: SearchCache<Value> = SearchCache::new();
    cache.set("venture debt", 10, 0, json!({"results": [1, 2]}));
    assert_eq!(
        cache.get("venture debt", 10, 0),
        Some(json!({"results": [1, 2]}))
    );
}

#[test]
fn lookup_is_case_and_whitespace_insensitive() {
    let mut cache: SearchCache<Value> = SearchCache::new();
    cache.set("foo ", 10, 0, json!("d"));
    assert_eq!(cache.get("Foo", 10, 0), Some(json!("d")));
    assert_eq!(cache.get("  FOO  ", 10, 0), Some(json!("d")));
}

#[test]
fn limit_and_offset_are_part_of_the_key() {
    let mut cache: SearchCache<Value> = SearchCache::new();
    cache.set("foo", 10, 0, json!(1));
    assert_eq!(cache.get("foo", 20, 0), None);
    assert_eq!(cache.get("foo", 10, 10), None);
}

#[test]
fn entry_expires_after_ttl_and_is_removed() {
    let start = Instant::now();
    let mut cache: SearchCache<Value> = SearchCache::new();
    cache.set_at("foo", 10, 0, json!(1), start);

    let just_before = start + SEARCH_CACHE_TTL - Duration::from_millis(1);
    assert_eq!(cache.get_at("foo", 10, 0, just_before), Some(json!(1)));

    let after = start + SEARCH_CACHE_TTL;
    assert_eq!(cache.get_at("foo", 10, 0, after), None);
    assert!(!cache.contains("foo", 10, 0));
    assert!(cache.is_empty());
}

#[test]
fn expired_entry_stays_until_read() {
    let start = Instant::now();
    let mut cache: SearchCache<Value> = SearchCache::new();
    cache.set_at("foo", 10, 0, json!(1), start);
    // No sweep: the stale entry is still held, but a read treats it as a miss.
    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.get_at("foo", 10, 0, start + SEARCH_CACHE_TTL * 2),
        None
    );
}

#[test]
fn inserting_past_capacity_evicts_earliest_inserted() {
    let mut cache: SearchCache<Value> = SearchCache::new();
    for i in 0..SEARCH_CACHE_CAPACITY {
        cache.set(&format!("query-{i}"), 10, 0, json!(i));
    }
    assert_eq!(cache.len(), SEARCH_CACHE_CAPACITY);

    // Reading does not refresh position (not LRU).
    assert!(cache.get("query-0", 10, 0).is_some());

    cache.set("query-new", 10, 0, json!("new"));
    assert_eq!(cache.len(), SEARCH_CACHE_CAPACITY);
    assert!(!cache.contains("query-0", 10, 0));
    assert!(cache.contains("query-1", 10, 0));
    assert!(cache.contains("query-new", 10, 0));
}

#[test]
fn eviction_skips_keys_already_expired_and_removed() {
    let start = Instant::now();
    let mut cache: SearchCache<Value> = SearchCache::with_limits(Duration::from_secs(10), 3);
    cache.set_at("a", 10, 0, json!("a"), start);
    cache.set_at("b", 10, 0, json!("b"), start + Duration::from_secs(5));
    cache.set_at("c", 10, 0, json!("c"), start + Duration::from_secs(5));

    // "a" expires and is dropped on read, so "b" is now the earliest present.
    assert_eq!(cache.get_at("a", 10, 0, start + Duration::from_secs(11)), None);

    cache.set_at("d", 10, 0, json!("d"), start + Duration::from_secs(11));
    cache.set_at("e", 10, 0, json!("e"), start + Duration::from_secs(11));
    assert_eq!(cache.len(), 3);
    assert!(!cache.contains("b", 10, 0));
    assert!(cache.contains("c", 10, 0));
    assert!(cache.contains("d", 10, 0));
    assert!(cache.contains("e", 10, 0));
}

#[test]
fn clear_removes_everything() {
    let mut cache: SearchCache<Value> = SearchCache::new();
    cache.set("a", 10, 0, json!(1));
    cache.set("b", 10, 0, json!(2));
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get("a", 10, 0), None);
}
