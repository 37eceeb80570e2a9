//! Dual-tier caching engine.
//!
//! ## Architecture
//!
//! - **Remote tier (Redis)**: shared across instances, TTL-native, with a
//!   sorted-set recency index for capacity-bounded eviction
//! - **Fallback tier (in-process)**: bounded, insertion-ordered safety net
//!   used whenever Redis is unreachable
//! - **Health monitor**: cached, time-bounded reachability verdict so hot
//!   paths never stack liveness probes
//!
//! ## Graceful Degradation
//!
//! A down or flapping Redis never surfaces as an error to callers: the
//! façade routes each call to whichever tier is usable and reports the
//! serving tier in its `source` field. The fallback store is purely an
//! in-memory safety net; it is not shared across processes and does not
//! survive restarts.

pub mod config;
pub mod error;
pub mod facade;
pub mod health;
pub mod local;
pub mod remote;
pub mod retrieval;
pub mod tier;
pub mod tool_results;

pub use config::{CacheConfig, RedisConfig};
pub use error::{CacheError, CacheResult};
pub use facade::{CacheLookup, CacheStats, TieredCache};
pub use health::{HealthMonitor, HealthProbe, HealthVerdict, RedisProbe};
pub use local::{CacheEntry, LocalStore};
pub use remote::RemoteStore;
pub use retrieval::RetrievalCache;
pub use tier::{CacheSource, CacheTier};
pub use tool_results::{ToolResultCache, ToolResultRecord};

use deadpool_redis::Pool;

/// Create a Redis pool for the remote tier, or `None` to run fallback-only.
///
/// ## Graceful Degradation
///
/// If Redis is disabled or the pool cannot be created, caches built without
/// a remote tier still serve every operation from the fallback store. The
/// first connection is not tested here; the health monitor probes lazily on
/// first use.
pub fn create_remote_pool(config: &RedisConfig) -> Option<Pool> {
    use std::time::Duration;

    if !config.enabled {
        tracing::info!("Redis disabled, using fallback store only");
        return None;
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let pool_config = redis_config.pool.get_or_insert_with(Default::default);
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));

    match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local store."
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_yields_no_pool() {
        let config = RedisConfig {
            enabled: false,
            ..RedisConfig::default()
        };
        assert!(create_remote_pool(&config).is_none());
    }

    #[test]
    fn test_enabled_config_yields_pool() {
        // Pool creation is lazy; no live Redis is needed here.
        let config = RedisConfig::default();
        assert!(create_remote_pool(&config).is_some());
    }
}
