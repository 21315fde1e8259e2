//! Tier 1 of the two-tier cache: a bounded, single-process LRU with
//! per-entry TTL. Best-effort - Tier 2 is the coherence point across
//! processes (spec: "Two-tier cache consistency").

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

pub struct LocalCache {
    default_ttl: Duration,
    store: Mutex<LruCache<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LocalCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            default_ttl,
            store: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Promotes the entry to MRU on a fresh hit; evicts and misses on an
    /// expired one.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut store = self.store.lock();
        let fresh = matches!(store.peek(key), Some(entry) if entry.expires_at > Instant::now());
        if fresh {
            let value = store.get(key).map(|entry| entry.value.clone());
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }
        store.pop(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Does not affect hit/miss counters or MRU order - a pure membership
    /// check honoring expiry.
    pub fn has(&self, key: &str) -> bool {
        let store = self.store.lock();
        matches!(store.peek(key), Some(entry) if entry.expires_at > Instant::now())
    }

    /// `put` evicts the current LRU entry when at capacity, matching tier 1's
    /// fixed-size invariant.
    pub fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.store.lock().put(key, Entry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        self.store.lock().pop(key);
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweeps every expired entry regardless of recency; used by a periodic
    /// maintenance task rather than the hot read/write path.
    pub fn cleanup(&self) -> usize {
        let mut store = self.store.lock();
        let now = Instant::now();
        let expired: Vec<String> = store
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let removed = expired.len();
        for key in expired {
            store.pop(&key);
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}
