//! The layered two-tier cache (C6): local tier 1 in front of a shared
//! tier 2, plus the decision-cache fingerprint function.

use crate::local::{CacheStats, LocalCache};
use crate::shared::{InMemorySharedStore, SharedStore};
use reaper_core::{CacheConfig, ContextValue, PolicyId, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct TwoTierCache {
    config: CacheConfig,
    local: LocalCache,
    shared: Arc<dyn SharedStore>,
}

impl TwoTierCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_shared_store(config, Arc::new(InMemorySharedStore::new()))
    }

    pub fn with_shared_store(config: CacheConfig, shared: Arc<dyn SharedStore>) -> Self {
        let local = LocalCache::new(config.max_size, config.ttl());
        Self { config, local, shared }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Consults tier 1 first, then tier 2 on a miss; a tier 2 hit
    /// back-fills tier 1 with the configured default TTL. Disabled mode is
    /// a uniform miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        if let Some(raw) = self.local.get(key) {
            return serde_json::from_str(&raw).ok();
        }

        match self.shared.get(key) {
            Ok(Some(raw)) => {
                self.local.set(key.to_string(), raw.clone(), Some(self.config.ttl()));
                serde_json::from_str(&raw).ok()
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, %key, "shared cache read failed, degrading to miss");
                None
            }
        }
    }

    /// Writes both tiers with the requested (or default) TTL. A tier 2
    /// write failure is logged and swallowed - the cache must never fail
    /// the evaluation it fronts.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let raw = serde_json::to_string(value).map_err(reaper_core::ReaperError::from)?;
        let ttl = ttl.unwrap_or_else(|| self.config.ttl());

        self.local.set(key.to_string(), raw.clone(), Some(ttl));
        if let Err(e) = self.shared.set(key, raw, Some(ttl)) {
            warn!(error = %e, %key, "shared cache write failed");
        }
        Ok(())
    }

    pub fn delete(&self, key: &str) {
        self.local.delete(key);
        if let Err(e) = self.shared.delete(key) {
            warn!(error = %e, %key, "shared cache delete failed");
        }
    }

    pub fn has(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.local.has(key) || self.shared.has(key).unwrap_or(false)
    }

    /// Returns the cached value, else computes it via `factory`, caches it,
    /// and returns it.
    pub fn get_or_set<T, F>(&self, key: &str, ttl: Option<Duration>, factory: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Ok(value);
        }
        let value = factory()?;
        self.set(key, &value, ttl)?;
        Ok(value)
    }

    /// Shared-store only per spec §4.5 - tier 1 entries matching the
    /// pattern are left to expire rather than scanned and evicted eagerly.
    pub fn delete_pattern(&self, pattern: &str) {
        if let Err(e) = self.shared.delete_pattern(pattern) {
            warn!(error = %e, %pattern, "shared cache delete_pattern failed");
        }
    }

    pub fn clear(&self) {
        self.local.clear();
        if let Err(e) = self.shared.clear() {
            warn!(error = %e, "shared cache clear failed");
        }
    }

    pub fn health(&self) -> bool {
        self.shared.ping().is_ok()
    }

    pub fn local_stats(&self) -> CacheStats {
        self.local.stats()
    }

    pub fn cleanup_local(&self) -> usize {
        self.local.cleanup()
    }
}

/// The decision cache key for an evaluation: `evaluation:<sha256(canonical
/// json of {context, sorted policy ids})>`. Sorting the policy ids makes the
/// key order-independent.
pub fn fingerprint(context: &ContextValue, policies: &[PolicyId]) -> String {
    let mut sorted = policies.to_vec();
    sorted.sort();
    let payload = serde_json::json!({"context": context, "policies": sorted});
    let canonical = payload.to_string();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("evaluation:{:x}", hasher.finalize())
}
