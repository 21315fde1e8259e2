//! # Reaper Core
//!
//! Shared types and traits for the Reaper policy decision point: the error
//! taxonomy, process configuration, the open evaluation-context tree, and
//! the identifier aliases every other crate in the workspace builds on.
//!
//! ## Decision point value
//! - A single deterministic evaluation path shared by the platform's HTTP
//!   surface, the sidecar-style evaluation service, and the CLI
//! - Config and error handling centralized so every crate reports failures
//!   the same way
//! - No enforcement here: this crate (and everything downstream of it) only
//!   ever produces a decision, never acts on one

pub mod config;
pub mod context;
pub mod error;
pub mod ids;

pub use config::{
    CacheConfig, DatabaseConfig, PerformanceConfig, RateLimitConfig, ReaperConfig, RedisConfig,
    ServerConfig,
};
pub use context::ContextValue;
pub use error::{ReaperError, Result};
pub use ids::{PolicyId, RecordId, RequestId, RuleId};

/// Current Reaper version for compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reaper build information for telemetry and debugging
pub const BUILD_INFO: &str = concat!(
    "Reaper ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Standard API endpoints for Reaper services
pub mod endpoints {
    pub const HEALTH: &str = "/health";
    pub const METRICS: &str = "/metrics";
    pub const API_V1_POLICIES: &str = "/api/v1/policies";
    pub const API_V1_EVALUATE: &str = "/api/v1/evaluate";
    pub const API_V1_SIMULATE: &str = "/api/v1/simulate";
    pub const API_V1_BATCH_EVALUATE: &str = "/api/v1/evaluate/batch";
    pub const API_V1_VALIDATE: &str = "/api/v1/policies/validate";
    pub const API_V1_AUDIT: &str = "/api/v1/audit";
}
