use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    inserted_at: Instant,
}

/// A single TTL+LRU-bounded in-process cache, keyed by an arbitrary
/// string (method name + arguments, deterministic per call site).
///
/// Uses `DashMap` for lock-free concurrent access, same idiom the
/// teacher uses for `MySQLPoolManager`'s pool table. Eviction is
/// insertion-order LRU rather than access-order: simple, and sufficient
/// since entries expire quickly relative to the bound sizes configured
/// here (the original Python used `cachetools.TTLCache`, which is also
/// insertion-order for its bounded eviction).
pub struct Cache<V: Clone> {
    entries: Arc<DashMap<String, Entry<V>>>,
    max_size: usize,
    ttl: Duration,
}

impl<V: Clone> Cache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self { entries: Arc::new(DashMap::new()), max_size, ttl }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at < Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: String, value: V) {
        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        let now = Instant::now();
        self.entries.insert(key, Entry { value, expires_at: now + self.ttl, inserted_at: now });
    }

    /// Invalidates every entry whose key contains `needle` — the Store
    /// invalidates by assessment id or user id substring.
    pub fn invalidate_containing(&self, needle: &str) {
        self.entries.retain(|k, _| !k.contains(needle));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|e| e.inserted_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest_key {
            self.entries.remove(&key);
        }
    }
}

/// The three process-local caches: persona lookups, scored assessments,
/// and per-user history pages.
pub struct Caches {
    pub persona: Cache<serde_json::Value>,
    pub assessment: Cache<serde_json::Value>,
    pub history: Cache<serde_json::Value>,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            persona: Cache::new(100, Duration::from_secs(3600)),
            assessment: Cache::new(500, Duration::from_secs(300)),
            history: Cache::new(200, Duration::from_secs(60)),
        }
    }

    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.persona.len(), self.assessment.len(), self.history.len())
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let cache: Cache<i32> = Cache::new(10, Duration::from_secs(60));
        cache.insert("k".to_string(), 42);
        assert_eq!(cache.get("k"), Some(42));
    }

    #[test]
    fn expires_after_ttl() {
        let cache: Cache<i32> = Cache::new(10, Duration::from_millis(10));
        cache.insert("k".to_string(), 42);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache: Cache<i32> = Cache::new(2, Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("b".to_string(), 2);
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("c".to_string(), 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn invalidate_containing_removes_matching_keys_only() {
        let cache: Cache<i32> = Cache::new(10, Duration::from_secs(60));
        cache.insert("assessment:123".to_string(), 1);
        cache.insert("assessment:456".to_string(), 2);
        cache.invalidate_containing("123");
        assert_eq!(cache.get("assessment:123"), None);
        assert_eq!(cache.get("assessment:456"), Some(2));
    }

    #[test]
    fn cache_coherence_after_write() {
        let cache: Cache<i32> = Cache::new(10, Duration::from_secs(60));
        cache.insert("assessment:1".to_string(), 1);
        cache.invalidate_containing("1");
        cache.insert("assessment:1".to_string(), 2);
        assert_eq!(cache.get("assessment:1"), Some(2));
    }
}
