//! Tier 2: the shared-store contract plus an in-process default
//! implementation. A real deployment backs this with Redis; the default
//! here keeps the crate self-contained and is what the workspace's tests
//! and benches exercise.

use dashmap::DashMap;
use reaper_core::{ReaperError, Result};
use regex::Regex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Boundary contract for tier 2. Every method returns a `Result` so a real
/// backend's connection failures have somewhere to go; callers are expected
/// to degrade reads to a miss and log write failures, never propagate them.
pub trait SharedStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    fn has(&self, key: &str) -> Result<bool>;
    fn delete_pattern(&self, pattern: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
    fn incr(&self, key: &str) -> Result<i64>;
    fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
    fn ping(&self) -> Result<()>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// In-memory stand-in for a real shared store (Redis in production
/// deployments). Counters used by `incr` are stored out-of-band from the
/// string value map so rate-limit counters and cached values never collide.
#[derive(Default)]
pub struct InMemorySharedStore {
    values: DashMap<String, Entry>,
    counters: DashMap<String, AtomicI64>,
}

impl InMemorySharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedStore for InMemorySharedStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            Some(_) => {
                self.values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.values.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        self.counters.remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let re = glob_to_regex(pattern)
            .map_err(|reason| ReaperError::CacheError { reason })?;
        let matching: Vec<String> = self
            .values
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| re.is_match(key))
            .collect();
        for key in matching {
            self.values.remove(&key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.values.clear();
        self.counters.clear();
        Ok(())
    }

    fn incr(&self, key: &str) -> Result<i64> {
        let counter = self.counters.entry(key.to_string()).or_insert_with(|| AtomicI64::new(0));
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        if let Some(mut entry) = self.values.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Translates a `*`-glob into an anchored regex. `*` matches any run of
/// characters; every other character is treated literally.
fn glob_to_regex(pattern: &str) -> std::result::Result<Regex, String> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    let body = escaped.join(".*");
    Regex::new(&format!("^{body}$")).map_err(|e| format!("invalid cache key pattern '{pattern}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let store = InMemorySharedStore::new();
        store.set("a", "1".to_string(), None).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn ttl_expires_the_entry() {
        let store = InMemorySharedStore::new();
        store.set("a", "1".to_string(), Some(Duration::from_millis(1))).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn incr_starts_at_one_and_accumulates() {
        let store = InMemorySharedStore::new();
        assert_eq!(store.incr("requests").unwrap(), 1);
        assert_eq!(store.incr("requests").unwrap(), 2);
    }

    #[test]
    fn delete_pattern_matches_glob_prefix() {
        let store = InMemorySharedStore::new();
        store.set("policy:1", "a".to_string(), None).unwrap();
        store.set("policy:2", "b".to_string(), None).unwrap();
        store.set("evaluation:1", "c".to_string(), None).unwrap();
        store.delete_pattern("policy:*").unwrap();
        assert!(!store.has("policy:1").unwrap());
        assert!(!store.has("policy:2").unwrap());
        assert!(store.has("evaluation:1").unwrap());
    }

    #[test]
    fn expire_applies_a_ttl_to_an_existing_key() {
        let store = InMemorySharedStore::new();
        store.set("a", "1".to_string(), None).unwrap();
        store.expire("a", Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.get("a").unwrap(), None);
    }
}
