//! Read-through memoizer.
//!
//! [`Cached`] wraps a [`Loader`] (usually a store-of-record query) and
//! consults the cache store before running it. The cache is best-effort:
//! store failures are logged and bypassed, loader failures are returned
//! unchanged.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::key::CacheArgs;
use super::{CacheClient, CacheConfig};

/// A fallible, asynchronous data-access operation.
///
/// `ctx` is the connection or collection handle the load runs against; it is
/// never part of the cache key. `args` identify the data and are.
#[async_trait]
pub trait Loader<C, A>: Send + Sync
where
    C: Sync + ?Sized,
    A: Sync,
{
    type Output: Send;

    async fn load(&self, ctx: &C, args: &A) -> anyhow::Result<Self::Output>;
}

/// A loader with read-through caching.
pub struct Cached<L> {
    client: CacheClient,
    config: CacheConfig,
    loader: L,
}

impl<L> Cached<L> {
    pub fn new(client: CacheClient, config: CacheConfig, loader: L) -> Self {
        Self {
            client,
            config,
            loader,
        }
    }

    /// Cache key for a call with these arguments.
    pub fn key<A: CacheArgs>(&self, args: &A) -> String {
        self.config.key(&args.key_args())
    }

    /// Run the loader through the cache.
    ///
    /// Hit: the cached value is returned without calling the loader.
    /// Miss: the loader runs and a non-null result is stored with the
    /// operation's TTL. Store errors never fail the call.
    pub async fn get<C, A>(&self, ctx: &C, args: &A) -> anyhow::Result<L::Output>
    where
        L: Loader<C, A>,
        L::Output: Serialize + DeserializeOwned,
        C: Sync + ?Sized,
        A: CacheArgs + Sync,
    {
        let key = self.key(args);

        let store_reachable = match self.client.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    debug!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    true
                }
            },
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, bypassing cache");
                !e.is_unavailable()
            }
        };

        let value = self.loader.load(ctx, args).await?;

        if store_reachable {
            self.store(&key, &value).await;
        }

        Ok(value)
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Result not cacheable");
                return;
            }
        };

        // Absent results are not cached
        if bytes == b"null" {
            return;
        }

        match self.client.set(key, &bytes, self.config.ttl).await {
            Ok(()) => debug!(key = %key, ttl = ?self.config.ttl, "Cached result"),
            Err(e) => warn!(key = %key, error = %e, "Cache write failed"),
        }
    }

    /// Drop the cached result of one call.
    ///
    /// Must be given the same arguments as the read it targets; different
    /// arguments build a different key and silently delete nothing.
    pub async fn invalidate<A: CacheArgs>(&self, args: &A) {
        let key = self.key(args);
        match self.client.delete(&key).await {
            Ok(existed) => debug!(key = %key, existed, "Invalidated cache entry"),
            Err(e) => warn!(key = %key, error = %e, "Cache invalidation failed"),
        }
    }
}
