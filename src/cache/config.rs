//! Cache configuration for a single cached operation.

use std::sync::Arc;
use std::time::Duration;

use super::key::{build_key, KeyArgs};
use super::views::CachedView;

/// Custom key builder. Receives the same identifying arguments as the default
/// builder, never a connection handle.
pub type KeyBuilderFn = Arc<dyn Fn(&KeyArgs) -> String + Send + Sync>;

/// Configuration for one cached operation.
#[derive(Clone)]
pub struct CacheConfig {
    /// Namespace of the operation's keys.
    pub prefix: String,

    /// Operation identity, second key segment.
    pub operation: String,

    /// Time-to-live for stored results.
    pub ttl: Duration,

    /// Overrides the default `prefix:operation:args` layout.
    pub key_builder: Option<KeyBuilderFn>,
}

impl CacheConfig {
    /// Create a config with an explicit TTL.
    pub fn new(prefix: impl Into<String>, operation: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            operation: operation.into(),
            ttl,
            key_builder: None,
        }
    }

    /// Create a config for a catalogued view.
    pub fn for_view(view: &CachedView, ttl: Duration) -> Self {
        Self::new(view.prefix, view.operation, ttl)
    }

    /// Set time-to-live (builder pattern).
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use a custom key builder.
    ///
    /// Keys produced this way are invisible to pattern invalidation unless
    /// they keep the `prefix:operation:user...` layout.
    #[must_use]
    #[allow(dead_code)]
    pub fn key_builder(mut self, builder: impl Fn(&KeyArgs) -> String + Send + Sync + 'static) -> Self {
        self.key_builder = Some(Arc::new(builder));
        self
    }

    /// Build the key for a call.
    pub fn key(&self, args: &KeyArgs) -> String {
        match &self.key_builder {
            Some(builder) => builder(args),
            None => build_key(&self.prefix, &self.operation, args),
        }
    }

    /// Views changing on every write: "last N" lists.
    pub fn recent(view: &CachedView) -> Self {
        Self::for_view(view, Duration::from_secs(300)) // 5 minutes
    }

    /// Per-day listings and day-by-day breakdowns.
    pub fn by_date(view: &CachedView) -> Self {
        Self::for_view(view, Duration::from_secs(900)) // 15 minutes
    }

    /// Totals and per-month aggregates.
    pub fn aggregate(view: &CachedView) -> Self {
        Self::for_view(view, Duration::from_secs(1800)) // 30 minutes
    }

    /// Rarely changing data: category lists, yearly aggregates.
    pub fn stable(view: &CachedView) -> Self {
        Self::for_view(view, Duration::from_secs(3600)) // 1 hour
    }

    /// Data that only changes when a new year starts being used.
    pub fn archive(view: &CachedView) -> Self {
        Self::for_view(view, Duration::from_secs(7200)) // 2 hours
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("prefix", &self.prefix)
            .field("operation", &self.operation)
            .field("ttl", &self.ttl)
            .field("custom_key_builder", &self.key_builder.is_some())
            .finish()
    }
}
