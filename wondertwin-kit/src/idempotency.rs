//! Idempotency cache: memo of `Idempotency-Key` header to stored response.
//!
//! Entries are never evicted automatically; `/admin/reset` is the only
//! thing that clears them, matching how vendor sandboxes behave within a
//! test run.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

/// A replayable stored response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Status code of the original response.
    pub status: u16,
    /// Body bytes of the original response.
    pub body: Vec<u8>,
    /// When the entry was created.
    pub created_at: SystemTime,
}

/// Keyed response memo.
#[derive(Debug, Default)]
pub struct IdempotencyCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl IdempotencyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a stored response.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let entries = self.entries.read().expect("idempotency lock poisoned");
        entries.get(key).cloned()
    }

    /// Stores a response under `key`.
    pub fn put(&self, key: impl Into<String>, status: u16, body: Vec<u8>) {
        let mut entries = self.entries.write().expect("idempotency lock poisoned");
        entries.insert(
            key.into(),
            CachedResponse {
                status,
                body,
                created_at: SystemTime::now(),
            },
        );
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.read().expect("idempotency lock poisoned");
        entries.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the cache.
    pub fn reset(&self) {
        let mut entries = self.entries.write().expect("idempotency lock poisoned");
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_round_trip() {
        let cache = IdempotencyCache::new();
        cache.put("key-1", 201, b"{\"id\":\"cus_1\"}".to_vec());
        let hit = cache.get("key-1").unwrap();
        assert_eq!(hit.status, 201);
        assert_eq!(hit.body, b"{\"id\":\"cus_1\"}");
    }

    #[test]
    fn miss_returns_none() {
        let cache = IdempotencyCache::new();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn reset_clears_entries() {
        let cache = IdempotencyCache::new();
        cache.put("a", 200, Vec::new());
        cache.put("b", 200, Vec::new());
        assert_eq!(cache.len(), 2);
        cache.reset();
        assert!(cache.is_empty());
    }

    #[test]
    fn put_overwrites_existing_key() {
        let cache = IdempotencyCache::new();
        cache.put("k", 200, b"first".to_vec());
        cache.put("k", 200, b"second".to_vec());
        assert_eq!(cache.get("k").unwrap().body, b"second");
        assert_eq!(cache.len(), 1);
    }
}
