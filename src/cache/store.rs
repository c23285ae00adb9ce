//! Cache store abstraction.
//!
//! A store is a plain key-value service with TTLs and glob scans. Everything
//! smarter (keys, serialization, invalidation scopes) lives above it.

use std::time::Duration;

use async_trait::async_trait;

use super::CacheResult;

/// Key-value backend used by the cache layer.
///
/// Implementations must be shareable across tasks; the same store instance is
/// used by every cached view and by the invalidation coordinator.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get raw bytes for a key. Expired keys read as `None`.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store bytes under a key, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete the given keys. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// List keys matching a glob pattern (`*` wildcard).
    async fn scan(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Release backend resources.
    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Check whether `key` matches a glob `pattern` where `*` matches any run of
/// characters, including an empty one.
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == key;
    }

    let (first, rest) = segments.split_first().unwrap_or((&"", &[]));
    let Some(mut remaining) = key.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = rest.split_last().unwrap_or((&"", &[]));
    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }

    remaining.ends_with(last)
}
