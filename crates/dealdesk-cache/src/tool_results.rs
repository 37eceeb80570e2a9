//! Cache for tool-call results.
//!
//! Keyed by the originating tool-call id, which is already unique per
//! invocation. Each record carries the full structured result, a condensed
//! summary for context assembly, and token counts for both. Timestamps are
//! serialized as RFC 3339 strings so the payload stays JSON-safe across the
//! remote tier.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::facade::{CacheLookup, CacheStats, TieredCache};

/// Rough token estimate at ~4 characters per token.
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// A cached tool-call result with its condensed form and token accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub tool_call_id: String,
    pub result: Value,
    pub summary: String,
    pub result_tokens: u32,
    pub summary_tokens: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

impl ToolResultRecord {
    /// Build a record, estimating token counts for the result and summary.
    pub fn new(tool_call_id: impl Into<String>, result: Value, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        let result_tokens = estimate_tokens(&result.to_string());
        let summary_tokens = estimate_tokens(&summary);
        Self {
            tool_call_id: tool_call_id.into(),
            result,
            summary,
            result_tokens,
            summary_tokens,
            completed_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Cache for tool-call results, keyed by tool-call id.
pub struct ToolResultCache {
    inner: TieredCache<ToolResultRecord>,
}

impl ToolResultCache {
    pub fn new(inner: TieredCache<ToolResultRecord>) -> Self {
        Self { inner }
    }

    pub async fn store(&self, record: ToolResultRecord) {
        let key = record.tool_call_id.clone();
        self.inner.set(&key, record).await;
    }

    pub async fn lookup(&self, tool_call_id: &str) -> CacheLookup<ToolResultRecord> {
        self.inner.get(tool_call_id).await
    }

    pub async fn invalidate(&self, tool_call_id: &str) -> bool {
        self.inner.delete(tool_call_id).await
    }

    pub async fn clear(&self) {
        self.inner.clear().await;
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}
