//! Generic cache façade with health-aware tier routing.
//!
//! Every operation consults the health monitor, dispatches to the remote
//! tier when it is usable, and retries on the local fallback store when a
//! live remote call fails. Remote-tier failures never reach the caller; a
//! degraded remote manifests only as latency and `source = "fallback"`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use deadpool_redis::Pool;
use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{CacheConfig, RedisConfig};
use crate::error::CacheResult;
use crate::health::HealthMonitor;
use crate::local::LocalStore;
use crate::remote::RemoteStore;
use crate::tier::{CacheSource, CacheTier};

/// Metric names as constants for consistency.
pub mod metric_names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_OPERATION_DURATION_SECONDS: &str = "cache_operation_duration_seconds";
}

/// Result of a façade `get`.
#[derive(Debug, Clone)]
pub struct CacheLookup<T> {
    pub value: Option<T>,
    pub hit: bool,
    /// Which tier served this lookup
    pub source: CacheSource,
    /// Wall-clock elapsed time, regardless of tier
    pub latency_ms: f64,
}

/// Point-in-time cache statistics, recomputed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Entry count of the currently active tier
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, `0.0` with no traffic
    pub hit_rate: f64,
    /// The tier currently serving traffic
    pub source: CacheSource,
}

/// The remote tier together with the health monitor for its endpoint.
struct RemoteBinding<T> {
    tier: Arc<dyn CacheTier<T>>,
    health: Arc<HealthMonitor>,
}

/// Dual-tier cache with a uniform get/set/delete/clear/stats contract.
///
/// All keys are implicitly prefixed with the instance's namespace so that
/// unrelated caches can share one Redis instance without collision. Hit and
/// miss counters are per-instance and live for the instance's lifetime.
pub struct TieredCache<T> {
    namespace: String,
    local: LocalStore<T>,
    remote: Option<RemoteBinding<T>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> TieredCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a fallback-only cache. Construction parameters are validated
    /// here; an invalid configuration is fatal, not retried.
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            namespace: config.namespace.clone(),
            local: LocalStore::new(
                config.max_local_entries,
                Duration::from_secs(config.ttl_secs),
            ),
            remote: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Create a dual-tier cache over an explicit remote tier.
    ///
    /// The health monitor is constructed once per remote endpoint and shared
    /// by every cache that targets it.
    pub fn with_remote(
        config: &CacheConfig,
        tier: Arc<dyn CacheTier<T>>,
        health: Arc<HealthMonitor>,
    ) -> CacheResult<Self> {
        let mut cache = Self::new(config)?;
        cache.remote = Some(RemoteBinding { tier, health });
        Ok(cache)
    }

    /// Create a dual-tier cache over a Redis pool.
    pub fn with_redis(
        config: &CacheConfig,
        redis: &RedisConfig,
        pool: Pool,
        health: Arc<HealthMonitor>,
    ) -> CacheResult<Self>
    where
        T: Serialize + DeserializeOwned,
    {
        redis.validate()?;
        let store = RemoteStore::from_config(pool, config, redis);
        Self::with_remote(config, Arc::new(store), health)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The health monitor bound to this cache's remote endpoint, if any.
    /// Exposed so operators and tests can force re-evaluation via `reset`.
    pub fn health(&self) -> Option<&Arc<HealthMonitor>> {
        self.remote.as_ref().map(|remote| &remote.health)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Look up a value.
    ///
    /// Routing: healthy remote first; a live remote failure logs a warning,
    /// clears the health verdict, and retries on the fallback store. An
    /// unhealthy verdict skips the remote entirely, which bounds the latency
    /// added by a down Redis to one probe per check interval.
    pub async fn get(&self, key: &str) -> CacheLookup<T> {
        let started = Instant::now();
        let full_key = self.namespaced(key);

        let mut remote_outcome = None;
        let mut source = CacheSource::Fallback;

        if let Some(remote) = &self.remote {
            if remote.health.is_healthy().await {
                match remote.tier.get(&full_key).await {
                    Ok(found) => {
                        remote_outcome = Some(found);
                        source = CacheSource::Remote;
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "remote get failed, retrying on fallback tier");
                        remote.health.reset();
                    }
                }
            }
        }

        let value = match remote_outcome {
            Some(found) => found,
            None => self.local.get(&full_key),
        };

        let hit = value.is_some();
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            counter!(
                metric_names::CACHE_HITS_TOTAL,
                "namespace" => self.namespace.clone(),
                "source" => source.as_str()
            )
            .increment(1);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            counter!(
                metric_names::CACHE_MISSES_TOTAL,
                "namespace" => self.namespace.clone(),
                "source" => source.as_str()
            )
            .increment(1);
        }

        let elapsed = started.elapsed();
        self.record_duration("get", elapsed);
        tracing::debug!(key = %key, hit, source = %source, "cache get");

        CacheLookup {
            value,
            hit,
            source,
            latency_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// Store a value. Same routing as `get`, hit/miss counters untouched.
    pub async fn set(&self, key: &str, value: T) {
        let started = Instant::now();
        let full_key = self.namespaced(key);
        let mut source = CacheSource::Fallback;
        let mut stored_remote = false;

        if let Some(remote) = &self.remote {
            if remote.health.is_healthy().await {
                match remote.tier.set(&full_key, &value).await {
                    Ok(()) => {
                        source = CacheSource::Remote;
                        stored_remote = true;
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "remote set failed, storing on fallback tier");
                        remote.health.reset();
                    }
                }
            }
        }

        if !stored_remote {
            self.local.insert(&full_key, value);
        }

        self.record_duration("set", started.elapsed());
        tracing::debug!(key = %key, source = %source, "cache set");
    }

    /// Remove an entry. Returns whether something was removed on the tier
    /// that handled the call.
    pub async fn delete(&self, key: &str) -> bool {
        let started = Instant::now();
        let full_key = self.namespaced(key);
        let mut outcome = None;
        let mut source = CacheSource::Fallback;

        if let Some(remote) = &self.remote {
            if remote.health.is_healthy().await {
                match remote.tier.delete(&full_key).await {
                    Ok(removed) => {
                        outcome = Some(removed);
                        source = CacheSource::Remote;
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "remote delete failed, deleting on fallback tier");
                        remote.health.reset();
                    }
                }
            }
        }

        let removed = outcome.unwrap_or_else(|| self.local.delete(&full_key));
        self.record_duration("delete", started.elapsed());
        tracing::debug!(key = %key, removed, source = %source, "cache delete");
        removed
    }

    /// Drop every entry. The local store is always cleared; the remote tier
    /// is cleared best-effort when healthy, so previously-set keys miss even
    /// across tier transitions. Hit/miss counters are not reset.
    pub async fn clear(&self) {
        if let Some(remote) = &self.remote {
            if remote.health.is_healthy().await {
                if let Err(e) = remote.tier.clear().await {
                    tracing::warn!(error = %e, "remote clear failed");
                    remote.health.reset();
                }
            }
        }
        self.local.clear();
        tracing::debug!(namespace = %self.namespace, "cache cleared");
    }

    /// Current statistics. Size reflects the tier that would serve the next
    /// call; on a live remote error it degrades to the fallback size.
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        let mut active = None;
        if let Some(remote) = &self.remote {
            if remote.health.is_healthy().await {
                match remote.tier.len().await {
                    Ok(size) => active = Some((size, CacheSource::Remote)),
                    Err(e) => {
                        tracing::debug!(error = %e, "remote size unavailable, reporting fallback size");
                    }
                }
            }
        }
        let (size, source) = active.unwrap_or_else(|| (self.local.len(), CacheSource::Fallback));

        CacheStats {
            size,
            hits,
            misses,
            hit_rate,
            source,
        }
    }

    /// Sweep expired entries from the fallback store. The remote tier
    /// expires entries natively.
    pub fn purge_expired(&self) -> usize {
        self.local.purge_expired()
    }

    fn record_duration(&self, operation: &'static str, elapsed: Duration) {
        histogram!(
            metric_names::CACHE_OPERATION_DURATION_SECONDS,
            "namespace" => self.namespace.clone(),
            "operation" => operation
        )
        .record(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_only() -> TieredCache<String> {
        TieredCache::new(&CacheConfig::for_namespace("test")).unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_hits() {
        let cache = local_only();
        cache.set("greeting", "hello".to_string()).await;

        let lookup = cache.get("greeting").await;
        assert!(lookup.hit);
        assert_eq!(lookup.value.as_deref(), Some("hello"));
        assert_eq!(lookup.source, CacheSource::Fallback);
        assert!(lookup.latency_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_unknown_key_misses() {
        let cache = local_only();
        let lookup = cache.get("nothing").await;
        assert!(!lookup.hit);
        assert!(lookup.value.is_none());
    }

    #[tokio::test]
    async fn test_delete_returns_whether_removed() {
        let cache = local_only();
        cache.set("a", "1".to_string()).await;
        cache.set("b", "2".to_string()).await;

        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);
        assert!(cache.get("b").await.hit);
    }

    #[tokio::test]
    async fn test_clear_makes_every_key_miss() {
        let cache = local_only();
        for i in 0..5 {
            cache.set(&format!("key{i}"), i.to_string()).await;
        }

        cache.clear().await;
        for i in 0..5 {
            assert!(!cache.get(&format!("key{i}")).await.hit);
        }
    }

    #[tokio::test]
    async fn test_hit_rate() {
        let cache = local_only();
        assert_eq!(cache.stats().await.hit_rate, 0.0);

        cache.set("a", "1".to_string()).await;
        cache.get("a").await; // hit
        cache.get("b").await; // miss

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
        assert_eq!(stats.source, CacheSource::Fallback);
    }

    #[tokio::test]
    async fn test_clear_preserves_counters() {
        let cache = local_only();
        cache.set("a", "1".to_string()).await;
        cache.get("a").await;
        cache.clear().await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_keys_are_namespaced() {
        let cache = local_only();
        assert_eq!(cache.namespaced("query-1"), "test:query-1");
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let config = CacheConfig {
            namespace: String::new(),
            ..CacheConfig::default()
        };
        assert!(TieredCache::<String>::new(&config).is_err());
    }
}
