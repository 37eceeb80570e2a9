//! Remote-tier reachability tracking.
//!
//! The monitor caches a time-bounded verdict so that hot-path cache calls
//! never pay for more than one liveness probe per check interval. A probe
//! failure caches `healthy = false` and starts the interval; the next call
//! after it elapses re-probes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use deadpool_redis::Pool;

use crate::error::{CacheError, CacheResult};

/// The cached judgment of remote-tier reachability.
#[derive(Debug, Clone)]
pub struct HealthVerdict {
    pub healthy: bool,
    pub checked_at: Instant,
}

/// Lightweight liveness probe against the remote endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> CacheResult<()>;
}

/// Probe that issues a pooled Redis `PING`, bounded by a timeout.
pub struct RedisProbe {
    pool: Pool,
    timeout: Duration,
}

impl RedisProbe {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl HealthProbe for RedisProbe {
    async fn ping(&self) -> CacheResult<()> {
        let probe = async {
            let mut conn = self.pool.get().await?;
            redis::cmd("PING").query_async::<()>(&mut conn).await?;
            Ok(())
        };
        match tokio::time::timeout(self.timeout, probe).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

/// Tracks remote reachability with a cached, time-bounded verdict.
///
/// Constructed once per remote endpoint and shared by every façade instance
/// that targets it. The verdict is a single lock-free field; concurrent
/// callers may race to re-probe, and the last write wins.
pub struct HealthMonitor {
    probe: Arc<dyn HealthProbe>,
    check_interval: Duration,
    verdict: ArcSwapOption<HealthVerdict>,
}

impl HealthMonitor {
    pub fn new(probe: Arc<dyn HealthProbe>, check_interval: Duration) -> Self {
        Self {
            probe,
            check_interval,
            verdict: ArcSwapOption::const_empty(),
        }
    }

    /// Convenience constructor wiring a `RedisProbe` to the given pool.
    pub fn for_redis(pool: Pool, probe_timeout: Duration, check_interval: Duration) -> Self {
        Self::new(Arc::new(RedisProbe::new(pool, probe_timeout)), check_interval)
    }

    /// Whether the remote tier is currently considered usable.
    ///
    /// Returns the cached verdict while its age is below the check interval;
    /// otherwise re-probes and caches the outcome. This is the only place a
    /// network call happens outside the tier operations themselves.
    pub async fn is_healthy(&self) -> bool {
        if let Some(verdict) = self.verdict.load_full() {
            if verdict.checked_at.elapsed() < self.check_interval {
                return verdict.healthy;
            }
        }

        let healthy = match self.probe.ping().await {
            Ok(()) => {
                tracing::debug!("remote liveness probe succeeded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote liveness probe failed, routing to fallback");
                false
            }
        };

        self.verdict.store(Some(Arc::new(HealthVerdict {
            healthy,
            checked_at: Instant::now(),
        })));
        healthy
    }

    /// Clear the cached verdict, forcing the next `is_healthy` call to
    /// re-probe. Used for test isolation and operational recovery triggers,
    /// and by the façade after a live remote failure.
    pub fn reset(&self) {
        self.verdict.store(None);
    }

    /// The last cached verdict, if any.
    pub fn last_verdict(&self) -> Option<Arc<HealthVerdict>> {
        self.verdict.load_full()
    }
}
