//! Cache layer errors.
//!
//! None of these ever reach a bot user: the memoizer and the invalidation
//! coordinator log them and carry on without the cache.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the cache store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache store connection failed: {0}")]
    Connection(String),

    #[error("cache store operation failed: {0}")]
    Operation(String),

    #[error("cache store did not answer within {0:?}")]
    Timeout(Duration),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Whether the store itself looks unreachable (as opposed to a bad payload).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
            Self::Connection(err.to_string())
        } else {
            Self::Operation(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for cache store operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = CacheError::Timeout(Duration::from_millis(500));
        assert_eq!(error.to_string(), "cache store did not answer within 500ms");
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(CacheError::Connection("refused".into()).is_unavailable());
        assert!(CacheError::Timeout(Duration::from_millis(1)).is_unavailable());
        assert!(!CacheError::Operation("WRONGTYPE".into()).is_unavailable());
        assert!(!CacheError::Serialization("eof".into()).is_unavailable());
    }
}
