//! Error types for cache operations

use std::time::Duration;

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Remote tier unreachable (connection refused, pool exhausted, error reply)
    #[error("Remote tier unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote operation exceeded its deadline
    #[error("Remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// Payload could not be encoded/decoded for the remote tier
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid construction parameter
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Create a new RemoteUnavailable error
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable(message.into())
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the façade can recover from this error by routing to the
    /// fallback tier. Configuration errors are fatal at construction time
    /// and are never retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::Timeout(_) | Self::Serialization(_)
        )
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::RemoteUnavailable(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        CacheError::RemoteUnavailable(err.to_string())
    }
}
