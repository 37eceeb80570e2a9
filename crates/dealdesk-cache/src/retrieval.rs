//! Cache for retrieval results, keyed by normalized query text.
//!
//! Semantically equivalent queries should collide on one entry, so the key
//! derivation is word-order independent: tokens are lowercased, short
//! low-information words are dropped, and the rest are sorted before being
//! joined and scoped to a deal.

use serde_json::Value;

use crate::facade::{CacheLookup, CacheStats, TieredCache};

/// Tokens shorter than this are treated as stop-words ("is", "the", "for").
const MIN_TOKEN_LEN: usize = 4;

/// Deal-scoped cache for retrieval results.
pub struct RetrievalCache {
    inner: TieredCache<Value>,
}

impl RetrievalCache {
    pub fn new(inner: TieredCache<Value>) -> Self {
        Self { inner }
    }

    /// Derive a word-order-independent key for a query within a deal.
    ///
    /// "Q3 revenue" and "revenue Q3" produce the same key; the deal id keeps
    /// identical queries against different deals apart.
    pub fn cache_key(query_text: &str, deal_id: &str) -> String {
        let mut tokens: Vec<String> = query_text
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|token| token.len() >= MIN_TOKEN_LEN)
            .collect();
        tokens.sort();
        format!("{}:{}", tokens.join("_"), deal_id)
    }

    pub async fn get(&self, query_text: &str, deal_id: &str) -> CacheLookup<Value> {
        self.inner.get(&Self::cache_key(query_text, deal_id)).await
    }

    pub async fn set(&self, query_text: &str, deal_id: &str, results: Value) {
        self.inner
            .set(&Self::cache_key(query_text, deal_id), results)
            .await;
    }

    pub async fn invalidate(&self, query_text: &str, deal_id: &str) -> bool {
        self.inner
            .delete(&Self::cache_key(query_text, deal_id))
            .await
    }

    pub async fn clear(&self) {
        self.inner.clear().await;
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use serde_json::json;

    fn cache() -> RetrievalCache {
        RetrievalCache::new(TieredCache::new(&CacheConfig::for_namespace("retrieval")).unwrap())
    }

    #[test]
    fn test_key_is_word_order_independent() {
        assert_eq!(
            RetrievalCache::cache_key("Q3 revenue", "deal-123"),
            RetrievalCache::cache_key("revenue Q3", "deal-123"),
        );
    }

    #[test]
    fn test_key_drops_stop_words() {
        let key = RetrievalCache::cache_key("what is the revenue for Q3", "deal-123");
        assert!(key.contains("deal-123"));
        assert!(key.contains("revenue"));
        assert!(!key.contains("_is_"));
        assert!(!key.contains("_the_"));
    }

    #[test]
    fn test_key_is_case_insensitive() {
        assert_eq!(
            RetrievalCache::cache_key("Revenue Projections", "deal-9"),
            RetrievalCache::cache_key("revenue projections", "deal-9"),
        );
    }

    #[test]
    fn test_key_separates_deals() {
        assert_ne!(
            RetrievalCache::cache_key("revenue", "deal-1"),
            RetrievalCache::cache_key("revenue", "deal-2"),
        );
    }

    #[tokio::test]
    async fn test_equivalent_queries_share_one_entry() {
        let cache = cache();
        cache
            .set("Q3 revenue figures", "deal-123", json!([{"doc": "a"}]))
            .await;

        let lookup = cache.get("figures revenue Q3", "deal-123").await;
        assert!(lookup.hit);
        assert_eq!(lookup.value, Some(json!([{"doc": "a"}])));
    }

    #[tokio::test]
    async fn test_other_deal_misses() {
        let cache = cache();
        cache.set("revenue figures", "deal-123", json!([])).await;

        assert!(!cache.get("revenue figures", "deal-456").await.hit);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = cache();
        cache.set("revenue figures", "deal-123", json!([])).await;

        assert!(cache.invalidate("figures revenue", "deal-123").await);
        assert!(!cache.get("revenue figures", "deal-123").await.hit);
    }
}
