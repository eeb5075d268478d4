//! Read-through cache for GET envelopes
//!
//! Entries are keyed by path plus query parameters and expire after a fixed
//! freshness window. Invalidation is coarse: a successful mutation clears
//! every entry.

use naturalize_core::ApiResponse;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Freshness window used when none is configured
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    response: ApiResponse,
    stored_at: Instant,
}

/// In-memory cache of successful GET envelopes
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    /// Create an empty cache with the given freshness window
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Freshness window
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key of a path and its query parameters
    ///
    /// Pairs are stably sorted by name, so `a=1&b=2` and `b=2&a=1` share a
    /// key while repeated names keep every value in the order given.
    #[must_use]
    pub fn key(path: &str, params: &[(String, String)]) -> String {
        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let rendered = serde_json::to_string(&pairs).unwrap_or_default();
        format!("{path}?{rendered}")
    }

    /// Fresh entry for `key`; a stale entry is evicted and reported as a miss
    pub fn get(&self, key: &str) -> Option<ApiResponse> {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|entry| entry.stored_at.elapsed() < self.ttl)?;

        if fresh {
            entries.get(key).map(|entry| entry.response.clone())
        } else {
            debug!(key, "evicting stale cache entry");
            entries.remove(key);
            None
        }
    }

    /// Store an envelope; the last writer wins
    pub fn insert(&self, key: String, response: ApiResponse) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                response,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry, returning how many there were
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    /// Number of stored entries, fresh or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
