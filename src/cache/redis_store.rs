//! Redis cache store.
//!
//! Pattern deletion uses cursor-based `SCAN ... MATCH` followed by a multi-key
//! `DEL`. The two steps are not atomic: a key written between them survives
//! until its TTL, which the invalidation coordinator accepts.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::store::CacheStore;
use super::CacheResult;

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// Redis backend using a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g. `redis://localhost:6379`)
    ///
    /// # Errors
    /// Returns `CacheError::Connection` if the server cannot be reached.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis cache store");
        Ok(Self { conn })
    }
}

/// `PSETEX` milliseconds for a TTL. Redis rejects zero, so sub-millisecond
/// TTLs round up to one.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(key, value, expiry_millis(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(keys).await?;
        Ok(deleted)
    }

    async fn scan(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return the same key twice across iterations
        keys.sort_unstable();
        keys.dedup();

        debug!(pattern = %pattern, found = keys.len(), "Redis scan complete");
        Ok(keys)
    }

    async fn close(&self) -> CacheResult<()> {
        // The connection manager closes its socket once the last clone drops.
        info!("Redis cache store released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to get Redis URL from environment.
    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Skip test if Redis not available.
    async fn get_test_store() -> Option<RedisStore> {
        tokio::time::timeout(Duration::from_secs(1), RedisStore::connect(&redis_url()))
            .await
            .ok()?
            .ok()
    }

    #[test]
    fn test_expiry_keeps_sub_second_precision() {
        assert_eq!(expiry_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(expiry_millis(Duration::from_millis(200)), 200);
        assert_eq!(expiry_millis(Duration::from_secs(900)), 900_000);
        assert_eq!(expiry_millis(Duration::ZERO), 1);
    }

    fn test_key(suffix: &str) -> String {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!("test:spendwise:{}:{}", nonce, suffix)
    }

    #[tokio::test]
    async fn test_redis_set_get_delete() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let key = test_key("set_get");
        store.set(&key, b"value", Duration::from_secs(30)).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(b"value".to_vec()));

        assert_eq!(store.delete(&[key.clone()]).await.unwrap(), 1);
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redis_scan_matches_pattern_only() {
        let Some(store) = get_test_store().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let stem = test_key("scan");
        let a = format!("{}:1:2024", stem);
        let b = format!("{}:1:2025", stem);
        let c = format!("{}:2:2024", stem);
        for key in [&a, &b, &c] {
            store.set(key, b"x", Duration::from_secs(30)).await.unwrap();
        }

        let found = store.scan(&format!("{}:1:*", stem)).await.unwrap();
        assert_eq!(found, vec![a.clone(), b.clone()]);

        store.delete(&[a, b, c]).await.unwrap();
    }
}
