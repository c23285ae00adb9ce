//! Cache client - the handle every cached component holds.
//!
//! Wraps a [`CacheStore`] with a short per-operation timeout. A slow store is
//! reported as [`CacheError::Timeout`] so callers can bypass the cache instead
//! of stalling a bot update.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::store::CacheStore;
use super::{CacheError, CacheResult};

/// Default per-operation timeout.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Shared handle to the cache store.
///
/// Cloning is cheap: clones share the same backend.
#[derive(Clone)]
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl CacheClient {
    /// Wrap a store using the default operation timeout.
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self::with_timeout(store, DEFAULT_OP_TIMEOUT)
    }

    /// Wrap a store with a custom operation timeout.
    pub fn with_timeout(store: impl CacheStore + 'static, timeout: Duration) -> Self {
        Self {
            store: Arc::new(store),
            timeout,
        }
    }

    /// Operation timeout applied to every store call.
    #[allow(dead_code)]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn timed<T>(&self, op: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    /// GET a key.
    pub async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.timed(self.store.get(key)).await
    }

    /// SET a key with a TTL.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.timed(self.store.set(key, value, ttl)).await
    }

    /// DELETE a single key. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let deleted = self.delete_many(&[key.to_string()]).await?;
        Ok(deleted > 0)
    }

    /// DELETE several keys in one round trip.
    pub async fn delete_many(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.timed(self.store.delete(keys)).await
    }

    /// SCAN for keys matching a glob pattern.
    pub async fn scan(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.timed(self.store.scan(pattern)).await
    }

    /// SCAN for a pattern and DELETE everything found.
    pub async fn delete_matching(&self, pattern: &str) -> CacheResult<u64> {
        let keys = self.scan(pattern).await?;
        let deleted = self.delete_many(&keys).await?;
        debug!(pattern = %pattern, deleted, "Deleted keys matching pattern");
        Ok(deleted)
    }

    /// Release the store. Call once on shutdown.
    pub async fn close(&self) -> CacheResult<()> {
        self.timed(self.store.close()).await?;
        info!("Cache client closed");
        Ok(())
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake stores for exercising failure paths.

    use async_trait::async_trait;

    use super::*;
    use crate::cache::MemoryStore;

    /// A store that refuses every operation.
    pub struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::Connection("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Connection("connection refused".into()))
        }

        async fn delete(&self, _keys: &[String]) -> CacheResult<u64> {
            Err(CacheError::Connection("connection refused".into()))
        }

        async fn scan(&self, _pattern: &str) -> CacheResult<Vec<String>> {
            Err(CacheError::Connection("connection refused".into()))
        }
    }

    /// A store that answers reads with a miss and rejects every write.
    pub struct ReadOnlyStore;

    #[async_trait]
    impl CacheStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Operation("READONLY You can't write against a read only replica".into()))
        }

        async fn delete(&self, _keys: &[String]) -> CacheResult<u64> {
            Ok(0)
        }

        async fn scan(&self, _pattern: &str) -> CacheResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    /// A working store whose SCAN always fails.
    pub struct NoScanStore(pub MemoryStore);

    #[async_trait]
    impl CacheStore for NoScanStore {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
            self.0.set(key, value, ttl).await
        }

        async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
            self.0.delete(keys).await
        }

        async fn scan(&self, _pattern: &str) -> CacheResult<Vec<String>> {
            Err(CacheError::Operation("ERR unknown command 'SCAN'".into()))
        }
    }

    /// A store that never answers in time.
    pub struct StalledStore;

    #[async_trait]
    impl CacheStore for StalledStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        async fn delete(&self, _keys: &[String]) -> CacheResult<u64> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(0)
        }

        async fn scan(&self, _pattern: &str) -> CacheResult<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StalledStore;
    use super::*;
    use crate::cache::MemoryStore;

    #[tokio::test]
    async fn test_delete_matching_removes_only_matches() {
        let client = CacheClient::new(MemoryStore::default());
        let ttl = Duration::from_secs(60);
        client.set("a:1", b"x", ttl).await.unwrap();
        client.set("a:2", b"x", ttl).await.unwrap();
        client.set("b:1", b"x", ttl).await.unwrap();

        assert_eq!(client.delete_matching("a:*").await.unwrap(), 2);
        assert!(client.get("a:1").await.unwrap().is_none());
        assert!(client.get("b:1").await.unwrap().is_some());

        // Nothing left to match
        assert_eq!(client.delete_matching("a:*").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_noop() {
        let client = CacheClient::new(MemoryStore::default());
        assert!(!client.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let client = CacheClient::with_timeout(StalledStore, Duration::from_millis(20));
        let err = client.get("k").await.unwrap_err();
        assert_eq!(err, CacheError::Timeout(Duration::from_millis(20)));
        assert!(err.is_unavailable());
    }
}
