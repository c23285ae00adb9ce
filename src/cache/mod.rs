//! Cache module - read-through caching over a key-value store.
//!
//! ## Architecture
//!
//! - `CacheStore` - backend trait, implemented by `RedisStore` and the
//!   in-process `MemoryStore`
//! - `CacheClient` - shared handle adding a per-operation timeout
//! - `Cached` - memoizes a `Loader` under keys built by `CacheConfig`
//! - `Invalidator` - drops every cached view a write makes stale
//! - `ReportImageCache` - byte cache for rendered charts
//!
//! Readers and the invalidator both take their key layout from the view
//! catalog in [`views`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = CacheClient::new(MemoryStore::default());
//! let total = Cached::new(client.clone(), CacheConfig::aggregate(&views::TOTAL_SPENT), TotalSpent);
//! let spent = total.get(&expenses, &UserArgs(user_id)).await?;
//!
//! Invalidator::new(client)
//!     .invalidate(&MutationScope::month(user_id, 2024, 3), Domain::Expense)
//!     .await;
//! ```

mod cached;
mod client;
mod config;
mod error;
mod images;
mod invalidation;
mod key;
mod memory;
mod redis_store;
mod store;
pub mod views;

pub use cached::{Cached, Loader};
pub use client::{CacheClient, DEFAULT_OP_TIMEOUT};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use images::{ImageKey, ReportImageCache, ReportKind, DEFAULT_IMAGE_TTL};
pub use invalidation::{Domain, InvalidationReport, Invalidator, MutationScope};
pub use key::{CacheArgs, KeyArgs};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::CacheStore;
