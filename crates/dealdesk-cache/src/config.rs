//! Cache and Redis configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Redis configuration for the remote tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades to the local tier without it)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Per-operation timeout in milliseconds. Exceeding it is treated
    /// like a connection error and triggers fallback for that call.
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,

    /// How long a cached health verdict stays valid before the next
    /// liveness probe
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

fn default_health_check_interval_secs() -> u64 {
    5
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> CacheResult<()> {
        if self.enabled && self.url.is_empty() {
            return Err(CacheError::configuration("redis.url must not be empty"));
        }
        if self.pool_size == 0 {
            return Err(CacheError::configuration("redis.pool_size must be > 0"));
        }
        if self.timeout_ms == 0 {
            return Err(CacheError::configuration("redis.timeout_ms must be > 0"));
        }
        if self.health_check_interval_secs == 0 {
            return Err(CacheError::configuration(
                "redis.health_check_interval_secs must be > 0",
            ));
        }
        Ok(())
    }
}

/// Per-instance cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key prefix isolating this cache's keys from other caches sharing
    /// the same Redis instance
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Entry TTL in seconds, applied by both tiers
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Local (fallback) tier max entries
    #[serde(default = "default_max_local_entries")]
    pub max_local_entries: usize,

    /// Remote tier max entries before recency-based trimming
    #[serde(default = "default_max_remote_entries")]
    pub max_remote_entries: usize,
}

fn default_namespace() -> String {
    "cache".to_string()
}

fn default_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_max_local_entries() -> usize {
    1000
}

fn default_max_remote_entries() -> usize {
    10000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            ttl_secs: default_ttl_secs(),
            max_local_entries: default_max_local_entries(),
            max_remote_entries: default_max_remote_entries(),
        }
    }
}

impl CacheConfig {
    /// Create a config for one named cache, keeping the remaining defaults.
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.namespace.is_empty() {
            return Err(CacheError::configuration("namespace must not be empty"));
        }
        if self.ttl_secs == 0 {
            return Err(CacheError::configuration("ttl_secs must be > 0"));
        }
        if self.max_local_entries == 0 {
            return Err(CacheError::configuration("max_local_entries must be > 0"));
        }
        if self.max_remote_entries == 0 {
            return Err(CacheError::configuration("max_remote_entries must be > 0"));
        }
        Ok(())
    }
}
