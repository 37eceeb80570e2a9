//! The capability interface both storage tiers implement.

use async_trait::async_trait;

use crate::error::CacheResult;

/// Which tier served a given operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    /// Remote key-value store
    Remote,
    /// Bounded in-process store
    Fallback,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for CacheSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One storage tier behind the cache façade.
///
/// The façade holds a tier reference chosen per call, which is what makes
/// fallback-on-live-failure possible: a remote error on one call routes
/// that call to the other implementation without touching the façade's
/// own state.
///
/// Keys arriving here are already namespaced by the façade.
#[async_trait]
pub trait CacheTier<T>: Send + Sync {
    /// Look up a value. `Ok(None)` is a miss; `Err` means the tier itself
    /// failed and the façade should retry elsewhere.
    async fn get(&self, key: &str) -> CacheResult<Option<T>>;

    /// Store a value under this tier's TTL, replacing any previous entry.
    async fn set(&self, key: &str, value: &T) -> CacheResult<()>;

    /// Remove an entry. Returns whether something was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Drop every entry owned by this tier.
    async fn clear(&self) -> CacheResult<()>;

    /// Number of entries currently held.
    async fn len(&self) -> CacheResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display() {
        assert_eq!(CacheSource::Remote.to_string(), "remote");
        assert_eq!(CacheSource::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CacheSource::Fallback).unwrap(),
            "\"fallback\""
        );
    }
}
