//! Category repository.
//!
//! Renaming or deleting a category rewrites the denormalized category name on
//! the user's expenses, so those writes also invalidate every expense view.

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use tracing::{debug, info};

use super::args::{UserArgs, UserRecordId};
use super::sum_of;
use crate::cache::{views, CacheClient, CacheConfig, Cached, Domain, Invalidator, Loader, MutationScope};
use crate::database::error::category_name;
use crate::database::models::{Category, CategoryStats, Expense, FALLBACK_CATEGORY};
use crate::database::{Database, LedgerError};

/// Collections the category loaders read.
struct CategoryStore {
    categories: Collection<Category>,
    expenses: Collection<Expense>,
}

/// Repository for expense categories.
pub struct CategoryRepository {
    store: CategoryStore,
    invalidator: Invalidator,

    list: Cached<UserCategories>,
    by_id: Cached<CategoryById>,
    stats: Cached<CategoryStatistics>,
}

impl CategoryRepository {
    pub fn new(db: &Database, cache: &CacheClient) -> Self {
        Self {
            store: CategoryStore {
                categories: db.collection("categories"),
                expenses: db.collection("expenses"),
            },
            invalidator: Invalidator::new(cache.clone()),
            list: Cached::new(cache.clone(), CacheConfig::stable(&views::USER_CATEGORIES), UserCategories),
            by_id: Cached::new(cache.clone(), CacheConfig::aggregate(&views::CATEGORY_BY_ID), CategoryById),
            stats: Cached::new(cache.clone(), CacheConfig::aggregate(&views::CATEGORY_STATS), CategoryStatistics),
        }
    }

    /// The user's categories sorted by name.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Category>> {
        self.list.get(&self.store, &UserArgs(user_id)).await
    }

    /// One of the user's categories.
    pub async fn get(&self, user_id: i64, id: ObjectId) -> Result<Option<Category>> {
        self.by_id.get(&self.store, &UserRecordId { user_id, id }).await
    }

    /// Resolve a category by name, ignoring case.
    pub async fn find_by_name(&self, user_id: i64, name: &str) -> Result<Option<Category>> {
        let categories = self.list(user_id).await?;
        Ok(categories.into_iter().find(|c| c.is_named(name)))
    }

    /// Spending summary of a category. Fails with [`LedgerError::UnknownCategory`].
    pub async fn statistics(&self, user_id: i64, id: ObjectId) -> Result<CategoryStats> {
        self.stats.get(&self.store, &UserRecordId { user_id, id }).await
    }

    /// Create a category.
    pub async fn add(&self, user_id: i64, name: &str) -> Result<Category> {
        let name = category_name(name)?;
        self.ensure_unique(user_id, &name, None).await?;

        let category = Category::new(user_id, name);
        self.store.categories.insert_one(&category).await?;
        debug!(user_id, category = %category.name, "Category added");

        self.invalidator
            .invalidate(&MutationScope::user(user_id), Domain::Category { reassigned: false })
            .await;
        Ok(category)
    }

    /// Rename a category and the expenses filed under it.
    pub async fn rename(&self, user_id: i64, id: ObjectId, new_name: &str) -> Result<Category> {
        let name = category_name(new_name)?;
        let mut category = self.fetch(user_id, id).await?.ok_or(LedgerError::UnknownCategory)?;
        self.ensure_unique(user_id, &name, Some(id)).await?;

        self.store
            .categories
            .update_one(doc! { "_id": id, "user_id": user_id }, doc! { "$set": { "name": &name } })
            .await?;
        let moved = self
            .store
            .expenses
            .update_many(
                doc! { "user_id": user_id, "category_id": id },
                doc! { "$set": { "category_name": &name } },
            )
            .await?;
        info!(user_id, from = %category.name, to = %name, expenses = moved.modified_count, "Category renamed");

        self.invalidator
            .invalidate(&MutationScope::user(user_id), Domain::Category { reassigned: true })
            .await;
        category.name = name;
        Ok(category)
    }

    /// Delete a category, moving its expenses to `target` or to the fallback
    /// category (created when missing). Returns the category that received the
    /// expenses.
    pub async fn delete(&self, user_id: i64, id: ObjectId, target: Option<ObjectId>) -> Result<Category> {
        let category = self.fetch(user_id, id).await?.ok_or(LedgerError::UnknownCategory)?;

        let target = match receiver_for(&category, target)? {
            Receiver::Category(target_id) => self
                .fetch(user_id, target_id)
                .await?
                .ok_or(LedgerError::UnknownCategory)?,
            Receiver::Fallback => self.fallback(user_id).await?,
        };

        let moved = self
            .store
            .expenses
            .update_many(
                doc! { "user_id": user_id, "category_id": id },
                doc! { "$set": { "category_id": target.id, "category_name": &target.name } },
            )
            .await?;
        self.store
            .categories
            .delete_one(doc! { "_id": id, "user_id": user_id })
            .await?;
        info!(
            user_id,
            category = %category.name,
            target = %target.name,
            expenses = moved.modified_count,
            "Category deleted"
        );

        self.invalidator
            .invalidate(&MutationScope::user(user_id), Domain::Category { reassigned: true })
            .await;
        Ok(target)
    }

    async fn fetch(&self, user_id: i64, id: ObjectId) -> Result<Option<Category>> {
        Ok(self
            .store
            .categories
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?)
    }

    /// The fallback category, created on first use.
    async fn fallback(&self, user_id: i64) -> Result<Category> {
        let filter = doc! { "user_id": user_id, "name": FALLBACK_CATEGORY };
        if let Some(category) = self.store.categories.find_one(filter).await? {
            return Ok(category);
        }
        let category = Category::new(user_id, FALLBACK_CATEGORY);
        self.store.categories.insert_one(&category).await?;
        debug!(user_id, "Fallback category created");
        Ok(category)
    }

    /// Reject `name` when another category of the user already uses it.
    async fn ensure_unique(&self, user_id: i64, name: &str, except: Option<ObjectId>) -> Result<()> {
        let cursor = self.store.categories.find(doc! { "user_id": user_id }).await?;
        let existing: Vec<Category> = cursor.try_collect().await?;
        let taken = existing
            .iter()
            .any(|c| Some(c.id) != except && c.is_named(name));
        if taken {
            return Err(LedgerError::CategoryExists(name.to_string()).into());
        }
        Ok(())
    }
}

// --- Loaders ---

struct UserCategories;

#[async_trait]
impl Loader<CategoryStore, UserArgs> for UserCategories {
    type Output = Vec<Category>;

    async fn load(&self, store: &CategoryStore, args: &UserArgs) -> Result<Vec<Category>> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = store
            .categories
            .find(doc! { "user_id": args.0 })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

struct CategoryById;

#[async_trait]
impl Loader<CategoryStore, UserRecordId> for CategoryById {
    type Output = Option<Category>;

    async fn load(&self, store: &CategoryStore, args: &UserRecordId) -> Result<Option<Category>> {
        Ok(store
            .categories
            .find_one(doc! { "_id": args.id, "user_id": args.user_id })
            .await?)
    }
}

struct CategoryStatistics;

#[async_trait]
impl Loader<CategoryStore, UserRecordId> for CategoryStatistics {
    type Output = CategoryStats;

    async fn load(&self, store: &CategoryStore, args: &UserRecordId) -> Result<CategoryStats> {
        let category = store
            .categories
            .find_one(doc! { "_id": args.id, "user_id": args.user_id })
            .await?
            .ok_or(LedgerError::UnknownCategory)?;

        let filter = filed_under(args);
        let total = sum_of(&store.expenses, filter.clone()).await?;
        let count = store.expenses.count_documents(filter).await?;
        Ok(CategoryStats::new(category.name, total, count))
    }
}

/// Where the expenses of a deleted category go.
#[derive(Debug, PartialEq)]
enum Receiver {
    Category(ObjectId),
    Fallback,
}

/// Expenses can move to another category or to the fallback one, but never
/// onto the category being deleted.
fn receiver_for(category: &Category, target: Option<ObjectId>) -> Result<Receiver, LedgerError> {
    match target {
        Some(target_id) if target_id == category.id => Err(LedgerError::CannotDeleteFallback(category.name.clone())),
        Some(target_id) => Ok(Receiver::Category(target_id)),
        None if category.name == FALLBACK_CATEGORY => Err(LedgerError::CannotDeleteFallback(category.name.clone())),
        None => Ok(Receiver::Fallback),
    }
}

fn filed_under(args: &UserRecordId) -> Document {
    doc! { "user_id": args.user_id, "category_id": args.id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheArgs;

    #[test]
    fn test_statistics_filter_is_scoped_to_the_user() {
        let id = ObjectId::new();
        let filter = filed_under(&UserRecordId { user_id: 7, id });
        assert_eq!(filter.get_i64("user_id").unwrap(), 7);
        assert_eq!(filter.get_object_id("category_id").unwrap(), id);
    }

    #[test]
    fn test_delete_onto_itself_is_refused() {
        let coffee = Category::new(7, "Coffee");
        assert_eq!(
            receiver_for(&coffee, Some(coffee.id)),
            Err(LedgerError::CannotDeleteFallback("Coffee".into()))
        );
    }

    #[test]
    fn test_fallback_needs_an_explicit_target() {
        let other = Category::new(7, FALLBACK_CATEGORY);
        assert_eq!(
            receiver_for(&other, None),
            Err(LedgerError::CannotDeleteFallback(FALLBACK_CATEGORY.into()))
        );

        let groceries = ObjectId::new();
        assert_eq!(receiver_for(&other, Some(groceries)), Ok(Receiver::Category(groceries)));
    }

    #[test]
    fn test_expenses_default_to_the_fallback() {
        let fuel = Category::new(7, "Fuel");
        assert_eq!(receiver_for(&fuel, None), Ok(Receiver::Fallback));
    }

    #[test]
    fn test_statistics_key_is_per_category() {
        let config = CacheConfig::aggregate(&views::CATEGORY_STATS);
        let a = config.key(&UserRecordId { user_id: 7, id: ObjectId::new() }.key_args());
        let b = config.key(&UserRecordId { user_id: 7, id: ObjectId::new() }.key_args());
        assert_ne!(a, b);
        assert!(a.starts_with("category_stats:get_category_statistics:7:"));
    }
}
