//! Remote tier backed by Redis.
//!
//! Values live as JSON strings under `SET .. EX`, and a sorted set at
//! `<namespace>:recent` records each key's last-touch timestamp. The sorted
//! set is eviction metadata only, never the source of truth: when it exceeds
//! the configured ceiling, the lowest-scored keys are trimmed together with
//! their values.
//!
//! Unlike the fallback tier, reads here count toward recency: a hit re-scores
//! the key in the index. The index cannot grow from reads (the paired `SET`
//! already inserted the member), so a read-heavy workload re-orders it
//! without inflating it.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::config::{CacheConfig, RedisConfig};
use crate::error::{CacheError, CacheResult};
use crate::tier::CacheTier;

/// Redis-backed store with a recency index for capacity-bounded eviction.
pub struct RemoteStore<T> {
    pool: Pool,
    index_key: String,
    ttl: Duration,
    max_entries: usize,
    op_timeout: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> RemoteStore<T> {
    pub fn new(
        pool: Pool,
        namespace: &str,
        ttl: Duration,
        max_entries: usize,
        op_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            index_key: format!("{namespace}:recent"),
            ttl,
            max_entries,
            op_timeout,
            _payload: PhantomData,
        }
    }

    pub fn from_config(pool: Pool, cache: &CacheConfig, redis: &RedisConfig) -> Self {
        Self::new(
            pool,
            &cache.namespace,
            Duration::from_secs(cache.ttl_secs),
            cache.max_remote_entries,
            Duration::from_millis(redis.timeout_ms),
        )
    }

    /// Run a remote operation under the per-operation deadline. Exceeding it
    /// is reported like a connection error.
    async fn bounded<R>(&self, op: impl Future<Output = CacheResult<R>>) -> CacheResult<R> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.op_timeout)),
        }
    }

    async fn connection(&self) -> CacheResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    /// Trim the lowest-scored (oldest) index entries and their values once
    /// the index cardinality exceeds the ceiling.
    async fn enforce_capacity(&self, conn: &mut deadpool_redis::Connection) -> CacheResult<()> {
        let cardinality: usize = conn.zcard(&self.index_key).await?;
        if cardinality <= self.max_entries {
            return Ok(());
        }

        let overflow = cardinality - self.max_entries;
        let oldest: Vec<String> = conn
            .zrange(&self.index_key, 0, overflow as isize - 1)
            .await?;
        if oldest.is_empty() {
            return Ok(());
        }

        redis::pipe()
            .atomic()
            .del(&oldest)
            .ignore()
            .zremrangebyrank(&self.index_key, 0, overflow as isize - 1)
            .ignore()
            .query_async::<()>(conn)
            .await?;

        tracing::debug!(
            evicted = oldest.len(),
            index = %self.index_key,
            "trimmed oldest entries from remote tier"
        );
        Ok(())
    }
}

#[async_trait]
impl<T> CacheTier<T> for RemoteStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CacheResult<Option<T>> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let raw: Option<String> = conn.get(key).await?;

            match raw {
                Some(json) => {
                    let value = serde_json::from_str(&json)?;

                    // Reads count toward recency on this tier.
                    let now = OffsetDateTime::now_utc().unix_timestamp();
                    if let Err(e) = conn.zadd::<_, _, _, ()>(&self.index_key, key, now).await {
                        tracing::debug!(key = %key, error = %e, "failed to refresh recency score");
                    }

                    Ok(Some(value))
                }
                None => {
                    // The index may still hold this key (value expired or the
                    // two stores disagree); prune it so it cannot shadow a
                    // live entry in the eviction order.
                    if let Err(e) = conn.zrem::<_, _, ()>(&self.index_key, key).await {
                        tracing::debug!(key = %key, error = %e, "failed to prune stale index entry");
                    }
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: &T) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;

        self.bounded(async {
            let mut conn = self.connection().await?;
            let now = OffsetDateTime::now_utc().unix_timestamp();

            // Value and index entry land in one atomic batch so a crash
            // between them cannot leave the index pointing at nothing.
            redis::pipe()
                .atomic()
                .set_ex(key, &json, self.ttl.as_secs())
                .ignore()
                .zadd(&self.index_key, key, now)
                .ignore()
                .query_async::<()>(&mut conn)
                .await?;

            self.enforce_capacity(&mut conn).await
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let (removed, _): (i64, i64) = redis::pipe()
                .atomic()
                .del(key)
                .zrem(&self.index_key, key)
                .query_async(&mut conn)
                .await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear(&self) -> CacheResult<()> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let members: Vec<String> = conn.zrange(&self.index_key, 0, -1).await?;

            let mut pipe = redis::pipe();
            pipe.atomic();
            if !members.is_empty() {
                pipe.del(&members).ignore();
            }
            pipe.del(&self.index_key).ignore();
            pipe.query_async::<()>(&mut conn).await?;

            tracing::debug!(
                removed = members.len(),
                index = %self.index_key,
                "cleared remote tier"
            );
            Ok(())
        })
        .await
    }

    async fn len(&self) -> CacheResult<usize> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            Ok(conn.zcard(&self.index_key).await?)
        })
        .await
    }
}
