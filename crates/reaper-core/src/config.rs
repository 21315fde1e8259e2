//! Process-wide configuration, loaded once at startup.
//!
//! Mirrors the teacher's small `Serialize + Deserialize` config structs
//! (`PlatformConfig`, `AgentConfig`) but fleshed out to the full
//! configuration surface a decision point needs. Values are read from the
//! environment (via `dotenvy`) with documented defaults so a bare `.env`-less
//! deployment still boots.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            max_size: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub grpc_port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            grpc_port: 50051,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_min: u32,
    pub pool_max: u32,
    pub ssl: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/reaper".to_string(),
            pool_min: 1,
            pool_max: 10,
            ssl: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisConfig {
    pub url: String,
    pub db: u8,
    pub key_prefix: String,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            db: 0,
            key_prefix: "reaper:".to_string(),
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceConfig {
    pub max_evaluation_time_ms: u64,
    pub max_policy_size_mb: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_evaluation_time_ms: 100,
            max_policy_size_mb: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReaperConfig {
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub performance: PerformanceConfig,
}

impl ReaperConfig {
    /// Loads configuration from the process environment, falling back to
    /// defaults for anything unset. Reads a `.env` file first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = ReaperConfig::default();

        if let Ok(v) = env::var("CACHE_ENABLED") {
            config.cache.enabled = parse_bool(&v, config.cache.enabled);
        }
        if let Some(v) = parse_env("CACHE_TTL_SECONDS") {
            config.cache.ttl_seconds = v;
        }
        if let Some(v) = parse_env("CACHE_MAX_SIZE") {
            config.cache.max_size = v;
        }
        if let Some(v) = parse_env("RATE_LIMIT_WINDOW_MS") {
            config.rate_limit.window_ms = v;
        }
        if let Some(v) = parse_env("RATE_LIMIT_MAX_REQUESTS") {
            config.rate_limit.max_requests = v;
        }
        if let Some(v) = parse_env("SERVER_PORT") {
            config.server.port = v;
        }
        if let Some(v) = parse_env("SERVER_GRPC_PORT") {
            config.server.grpc_port = v;
        }
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Some(v) = parse_env("DATABASE_POOL_MIN") {
            config.database.pool_min = v;
        }
        if let Some(v) = parse_env("DATABASE_POOL_MAX") {
            config.database.pool_max = v;
        }
        if let Ok(v) = env::var("DATABASE_SSL") {
            config.database.ssl = parse_bool(&v, config.database.ssl);
        }
        if let Ok(v) = env::var("REDIS_URL") {
            config.redis.url = v;
        }
        if let Some(v) = parse_env("REDIS_DB") {
            config.redis.db = v;
        }
        if let Ok(v) = env::var("REDIS_KEY_PREFIX") {
            config.redis.key_prefix = v;
        }
        if let Ok(v) = env::var("REDIS_PASSWORD") {
            config.redis.password = Some(v);
        }
        if let Some(v) = parse_env("PERFORMANCE_MAX_EVALUATION_TIME_MS") {
            config.performance.max_evaluation_time_ms = v;
        }
        if let Some(v) = parse_env("PERFORMANCE_MAX_POLICY_SIZE_MB") {
            config.performance.max_policy_size_mb = v;
        }

        config
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
