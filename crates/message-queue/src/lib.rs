//! The two-tier decision cache (C6): a bounded local LRU+TTL tier in front
//! of a shared store, fronting policy evaluations so repeat requests for
//! the same `(context, policies)` skip re-evaluation entirely.

pub mod cache;
pub mod local;
pub mod shared;

pub use cache::{fingerprint, TwoTierCache};
pub use local::{CacheStats, LocalCache};
pub use shared::{InMemorySharedStore, SharedStore};

pub use reaper_core;
