//! Bounded in-process fallback store.
//!
//! This is the tier that serves traffic when Redis is unreachable. It keeps
//! entries in insertion order and evicts the oldest-inserted entry when a
//! brand-new key would exceed capacity (FIFO, not LRU). The fallback path
//! deliberately skips recency bookkeeping; the remote tier is the one that
//! tracks recency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::CacheResult;
use crate::tier::CacheTier;

/// A cached value with its expiry deadline.
///
/// Owned exclusively by the tier that stored it; entries are never shared
/// across tiers.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded, TTL-aware, insertion-ordered map.
///
/// `IndexMap` preserves insertion order, which gives strict FIFO eviction;
/// overwriting an existing key keeps its original position, so age is
/// measured from first insertion, not last write.
pub struct LocalStore<T> {
    entries: Mutex<IndexMap<String, CacheEntry<T>>>,
    max_entries: usize,
    ttl: Duration,
    evictions: AtomicU64,
}

impl<T: Clone> LocalStore<T> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            max_entries,
            ttl,
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a value. An entry observed at or past its expiry is removed
    /// before reporting a miss.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                entries.shift_remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite a value.
    ///
    /// Inserting a brand-new key at capacity first evicts the oldest-inserted
    /// surviving entry. Overwrites do not count against capacity and reset
    /// the entry's expiry.
    pub fn insert(&self, key: &str, value: T) {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::debug!(key = %evicted, "evicted oldest entry from fallback store");
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.insert(key.to_string(), CacheEntry::new(value, self.ttl));
    }

    /// Remove an entry. Returns whether something was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().shift_remove(key).is_some()
    }

    /// Drop all entries. Cumulative counters owned by the façade are not
    /// affected.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries currently held, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sweep expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "purged expired entries from fallback store");
        }
        removed
    }

    /// Entries evicted so far (capacity, expiry, or sweep).
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<T> CacheTier<T> for LocalStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CacheResult<Option<T>> {
        Ok(LocalStore::get(self, key))
    }

    async fn set(&self, key: &str, value: &T) -> CacheResult<()> {
        self.insert(key, value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(LocalStore::delete(self, key))
    }

    async fn clear(&self) -> CacheResult<()> {
        LocalStore::clear(self);
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(LocalStore::len(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let store = LocalStore::new(10, Duration::from_secs(60));
        store.insert("a", 1);

        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let store: LocalStore<i32> = LocalStore::new(10, Duration::from_secs(60));
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let store = LocalStore::new(10, Duration::from_millis(10));
        store.insert("a", 1);

        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.get("a"), None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.evictions(), 1);
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let store = LocalStore::new(5, Duration::from_secs(60));
        for i in 0..6 {
            store.insert(&format!("key{i}"), i);
        }

        assert_eq!(store.get("key0"), None);
        assert_eq!(store.get("key5"), Some(5));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_eviction_is_by_insertion_not_access() {
        let store = LocalStore::new(3, Duration::from_secs(60));
        store.insert("a", 1);
        store.insert("b", 2);
        store.insert("c", 3);

        // Reading "a" must not protect it from eviction.
        assert_eq!(store.get("a"), Some(1));
        store.insert("d", 4);

        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(2));
        assert_eq!(store.get("d"), Some(4));
    }

    #[test]
    fn test_overwrite_does_not_count_against_capacity() {
        let store = LocalStore::new(2, Duration::from_secs(60));
        store.insert("a", 1);
        store.insert("b", 2);
        store.insert("a", 10);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(10));
        assert_eq!(store.get("b"), Some(2));
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let store = LocalStore::new(2, Duration::from_secs(60));
        store.insert("a", 1);
        store.insert("b", 2);
        store.insert("a", 10);

        // "a" is still the oldest-inserted entry, so it goes first.
        store.insert("c", 3);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(2));
        assert_eq!(store.get("c"), Some(3));
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let store = LocalStore::new(10, Duration::from_millis(100));
        store.insert("a", 1);

        std::thread::sleep(Duration::from_millis(60));
        store.insert("a", 2);
        std::thread::sleep(Duration::from_millis(60));

        // Original deadline has passed; the rewrite pushed it out.
        assert_eq!(store.get("a"), Some(2));
    }

    #[test]
    fn test_delete_removes_only_that_key() {
        let store = LocalStore::new(10, Duration::from_secs(60));
        store.insert("a", 1);
        store.insert("b", 2);

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(2));
    }

    #[test]
    fn test_clear() {
        let store = LocalStore::new(10, Duration::from_secs(60));
        for i in 0..5 {
            store.insert(&format!("key{i}"), i);
        }

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.get("key0"), None);
    }

    #[test]
    fn test_purge_expired() {
        let store = LocalStore::new(10, Duration::from_millis(10));
        store.insert("a", 1);
        store.insert("b", 2);

        std::thread::sleep(Duration::from_millis(20));
        store.insert("c", 3);

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("c"), Some(3));
    }

    #[tokio::test]
    async fn test_tier_interface() {
        let store = LocalStore::new(10, Duration::from_secs(60));
        let tier: &dyn CacheTier<i32> = &store;

        tier.set("a", &1).await.unwrap();
        assert_eq!(tier.get("a").await.unwrap(), Some(1));
        assert!(tier.delete("a").await.unwrap());
        assert_eq!(tier.len().await.unwrap(), 0);
    }
}
