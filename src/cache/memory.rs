//! In-process cache store backed by Moka.
//!
//! Used when no Redis URL is configured (single instance only) and as the
//! fake store in tests. Every entry carries its own TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::store::{pattern_matches, CacheStore};
use super::CacheResult;

/// Source of the current instant for expiry checks.
type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// Stored bytes plus the TTL they were written with.
#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Arc<[u8]>,
    ttl: Duration,
    expires_at: Instant,
}

impl StoredValue {
    fn new(bytes: &[u8], ttl: Duration, now: Instant) -> Self {
        Self {
            bytes: Arc::from(bytes),
            ttl,
            expires_at: now + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Per-entry expiry policy: an entry lives exactly as long as its own TTL,
/// and overwriting an entry restarts the clock.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-backed [`CacheStore`].
///
/// Cloning is cheap and shares the same underlying cache. Moka evicts expired
/// entries on its own schedule; reads additionally check each entry's expiry
/// against the store's clock.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Cache<String, StoredValue>,
    clock: Clock,
}

impl MemoryStore {
    /// Create a store holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self::with_clock(max_capacity, Arc::new(Instant::now))
    }

    fn with_clock(max_capacity: u64, clock: Clock) -> Self {
        let inner = Cache::builder()
            .name("spendwise-memory-store")
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner, clock }
    }

    fn now(&self) -> Instant {
        (self.clock)()
    }

    /// Number of live entries (approximate under concurrent writes).
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        let now = self.now();
        self.inner.iter().filter(|(_, value)| value.is_live(now)).count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(50_000)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self
            .inner
            .get(key)
            .await
            .filter(|value| value.is_live(self.now()))
            .map(|value| value.bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.inner
            .insert(key.to_string(), StoredValue::new(value, ttl, self.now()))
            .await;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let now = self.now();
        let mut deleted = 0;
        for key in keys {
            if let Some(value) = self.inner.remove(key).await {
                if value.is_live(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn scan(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let now = self.now();
        Ok(self
            .inner
            .iter()
            .filter(|(key, value)| value.is_live(now) && pattern_matches(pattern, key))
            .map(|(key, _)| key.to_string())
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Store with a hand-driven clock, for expiry tests without sleeping.

    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// A clock that only moves when told to.
    #[derive(Clone)]
    pub struct ManualClock {
        start: Instant,
        elapsed_ms: Arc<AtomicU64>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
                elapsed_ms: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.elapsed_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }

        pub fn now(&self) -> Instant {
            self.start + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
        }
    }

    /// A [`MemoryStore`] reading time from `clock`.
    pub fn store_with(clock: &ManualClock) -> MemoryStore {
        let clock = clock.clone();
        MemoryStore::with_clock(10_000, Arc::new(move || clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{store_with, ManualClock};
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::default();
        store.set("k", b"hello", TTL).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_own_ttl() {
        let clock = ManualClock::new();
        let store = store_with(&clock);
        store.set("short", b"a", Duration::from_secs(30)).await.unwrap();
        store.set("long", b"b", TTL).await.unwrap();

        assert_eq!(store.get("short").await.unwrap(), Some(b"a".to_vec()));
        clock.advance(Duration::from_secs(31));

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.scan("*").await.unwrap(), vec!["long".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_counts_existing_keys() {
        let store = MemoryStore::default();
        store.set("a", b"1", TTL).await.unwrap();
        store.set("b", b"2", TTL).await.unwrap();

        let deleted = store
            .delete(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.delete(&["a".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_uses_glob_semantics() {
        let store = MemoryStore::default();
        store.set("monthly:op:1:2024:3", b"x", TTL).await.unwrap();
        store.set("monthly:op:1:2024:4", b"x", TTL).await.unwrap();
        store.set("monthly:op:2:2024:3", b"x", TTL).await.unwrap();

        let mut keys = store.scan("monthly:op:1:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["monthly:op:1:2024:3", "monthly:op:1:2024:4"]);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_ttl() {
        let clock = ManualClock::new();
        let store = store_with(&clock);
        store.set("k", b"old", Duration::from_secs(30)).await.unwrap();
        store.set("k", b"new", TTL).await.unwrap();

        clock.advance(Duration::from_secs(31));

        assert_eq!(store.get("k").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_binary_round_trip() {
        let store = MemoryStore::default();
        let value: Vec<u8> = (0..=255).collect();
        store.set("bin", &value, TTL).await.unwrap();
        assert_eq!(store.get("bin").await.unwrap(), Some(value));
    }
}
