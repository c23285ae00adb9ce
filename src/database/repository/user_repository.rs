//! User repository.

use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::Collection;
use tracing::info;

use crate::cache::{CacheClient, Domain, Invalidator, MutationScope};
use crate::database::models::{Category, UserRecord, DEFAULT_CATEGORIES};
use crate::database::Database;

/// Repository for bot users.
pub struct UserRepo {
    collection: Collection<UserRecord>,
    categories: Collection<Category>,
    invalidator: Invalidator,
    /// Users known to exist, so registration skips the database.
    registered: Cache<i64, ()>,
}

impl UserRepo {
    pub fn new(db: &Database, cache: &CacheClient) -> Self {
        Self {
            collection: db.collection("users"),
            categories: db.collection("categories"),
            invalidator: Invalidator::new(cache.clone()),
            registered: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(Duration::from_secs(3600))
                .build(),
        }
    }

    /// [`get_or_create`](Self::get_or_create) once per user and process.
    pub async fn ensure_registered(&self, user_id: i64, username: Option<&str>) -> Result<()> {
        if self.registered.contains_key(&user_id) {
            return Ok(());
        }
        self.get_or_create(user_id, username).await?;
        self.registered.insert(user_id, ()).await;
        Ok(())
    }

    /// Register a user on first contact, seeding the default categories.
    ///
    /// Returns `true` when the user was created by this call.
    pub async fn get_or_create(&self, user_id: i64, username: Option<&str>) -> Result<bool> {
        let record = UserRecord::new(user_id, username.map(str::to_string));
        let options = UpdateOptions::builder().upsert(true).build();
        let result = self
            .collection
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": { "username": record.username.clone() },
                    "$setOnInsert": { "created_at": record.created_at },
                },
            )
            .with_options(options)
            .await?;

        if result.upserted_id.is_none() {
            return Ok(false);
        }

        let defaults: Vec<Category> = DEFAULT_CATEGORIES
            .iter()
            .map(|name| Category::new(user_id, *name))
            .collect();
        self.categories.insert_many(&defaults).await?;
        info!(user_id, "New user registered");

        // A cached empty category list may predate registration
        self.invalidator
            .invalidate(&MutationScope::user(user_id), Domain::Category { reassigned: false })
            .await;
        Ok(true)
    }

    /// Wipe every cached view of a user.
    pub async fn reset_cache(&self, user_id: i64) -> u64 {
        self.invalidator.invalidate_user(user_id).await.deleted
    }
}
