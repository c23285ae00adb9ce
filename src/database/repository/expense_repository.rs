//! Expense repository.
//!
//! Every read goes through a read-through cache keyed by the view catalog;
//! every write invalidates the expense views of the touched month.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use tracing::debug;

use super::args::{UserArgs, UserDate, UserLimit, UserMonth, UserRecordId, UserYear};
use super::{decode_rows, sum_of};
use crate::cache::{views, CacheClient, CacheConfig, Cached, Domain, Invalidator, Loader, MutationScope};
use crate::database::error::{description, positive_amount};
use crate::database::models::{Category, CategoryTotal, DailyCategoryTotal, Expense, MonthlyCategoryTotal};
use crate::database::{Database, LedgerError};

/// Repository for expenses.
pub struct ExpenseRepository {
    collection: Collection<Expense>,
    categories: Collection<Category>,
    invalidator: Invalidator,

    total_spent: Cached<TotalSpent>,
    unique_years: Cached<UniqueYears>,
    last: Cached<LastExpenses>,
    by_id: Cached<ExpenseById>,
    by_date: Cached<ExpensesByDate>,
    daily: Cached<DailyExpenses>,
    monthly: Cached<MonthlyExpenses>,
    yearly: Cached<YearlyExpenses>,
}

impl ExpenseRepository {
    pub fn new(db: &Database, cache: &CacheClient) -> Self {
        Self {
            collection: db.collection("expenses"),
            categories: db.collection("categories"),
            invalidator: Invalidator::new(cache.clone()),
            total_spent: Cached::new(cache.clone(), CacheConfig::aggregate(&views::TOTAL_SPENT), TotalSpent),
            unique_years: Cached::new(cache.clone(), CacheConfig::archive(&views::UNIQUE_YEARS), UniqueYears),
            last: Cached::new(cache.clone(), CacheConfig::recent(&views::LAST_EXPENSES), LastExpenses),
            by_id: Cached::new(cache.clone(), CacheConfig::by_date(&views::EXPENSE_BY_ID), ExpenseById),
            by_date: Cached::new(cache.clone(), CacheConfig::by_date(&views::EXPENSES_BY_DATE), ExpensesByDate),
            daily: Cached::new(cache.clone(), CacheConfig::by_date(&views::DAILY_EXPENSES), DailyExpenses),
            monthly: Cached::new(cache.clone(), CacheConfig::aggregate(&views::MONTHLY_EXPENSES), MonthlyExpenses),
            yearly: Cached::new(cache.clone(), CacheConfig::stable(&views::YEARLY_EXPENSES), YearlyExpenses),
        }
    }

    // --- Reads ---

    /// Sum of all expenses of a user.
    pub async fn total_spent(&self, user_id: i64) -> Result<f64> {
        self.total_spent.get(&self.collection, &UserArgs(user_id)).await
    }

    /// Years with at least one expense, ascending. The current year when none.
    pub async fn unique_years(&self, user_id: i64) -> Result<Vec<i32>> {
        self.unique_years.get(&self.collection, &UserArgs(user_id)).await
    }

    /// Most recent expenses, newest first.
    pub async fn last(&self, user_id: i64, limit: i64) -> Result<Vec<Expense>> {
        self.last.get(&self.collection, &UserLimit { user_id, limit }).await
    }

    /// One expense of the user.
    pub async fn by_id(&self, user_id: i64, id: ObjectId) -> Result<Option<Expense>> {
        self.by_id.get(&self.collection, &UserRecordId { user_id, id }).await
    }

    /// Expenses recorded on one day.
    pub async fn by_date(&self, user_id: i64, date: NaiveDate) -> Result<Vec<Expense>> {
        self.by_date.get(&self.collection, &UserDate { user_id, date }).await
    }

    /// Per day and category totals of a month.
    pub async fn daily(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<DailyCategoryTotal>> {
        self.daily.get(&self.collection, &UserMonth { user_id, year, month }).await
    }

    /// Per category totals of a month.
    pub async fn monthly(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<CategoryTotal>> {
        self.monthly.get(&self.collection, &UserMonth { user_id, year, month }).await
    }

    /// Per month and category totals of a year.
    pub async fn yearly(&self, user_id: i64, year: i32) -> Result<Vec<MonthlyCategoryTotal>> {
        self.yearly.get(&self.collection, &UserYear { user_id, year }).await
    }

    // --- Writes ---

    /// Record an expense in one of the user's categories.
    pub async fn add(
        &self,
        user_id: i64,
        date: NaiveDate,
        amount: f64,
        category_id: ObjectId,
        note: Option<&str>,
    ) -> Result<Expense> {
        let amount = positive_amount(amount)?;
        let category = self
            .categories
            .find_one(doc! { "_id": category_id, "user_id": user_id })
            .await?
            .ok_or(LedgerError::UnknownCategory)?;

        let expense = Expense::new(user_id, date, amount, category.id, category.name, description(note));
        self.collection.insert_one(&expense).await?;
        debug!(user_id, expense_id = %expense.id, amount, "Expense added");

        self.invalidator
            .invalidate(&MutationScope::month(user_id, date.year(), date.month()), Domain::Expense)
            .await;
        Ok(expense)
    }

    /// Delete an expense. Only the owner may delete it.
    ///
    /// Returns `false` when the expense does not exist or belongs to someone else.
    pub async fn delete(&self, user_id: i64, id: ObjectId) -> Result<bool> {
        let Some(expense) = self
            .collection
            .find_one_and_delete(doc! { "_id": id, "user_id": user_id })
            .await?
        else {
            return Ok(false);
        };
        debug!(user_id, expense_id = %id, "Expense deleted");

        self.invalidate_record(&expense).await;
        Ok(true)
    }

    /// Move one expense to another of the user's categories.
    ///
    /// Returns `false` when the expense does not exist or belongs to someone else.
    pub async fn change_category(&self, user_id: i64, id: ObjectId, category_id: ObjectId) -> Result<bool> {
        let category = self
            .categories
            .find_one(doc! { "_id": category_id, "user_id": user_id })
            .await?
            .ok_or(LedgerError::UnknownCategory)?;

        let Some(expense) = self
            .collection
            .find_one_and_update(
                doc! { "_id": id, "user_id": user_id },
                doc! { "$set": { "category_id": category.id, "category_name": &category.name } },
            )
            .await?
        else {
            return Ok(false);
        };
        debug!(user_id, expense_id = %id, category = %category.name, "Expense category changed");

        self.invalidate_record(&expense).await;
        Ok(true)
    }

    async fn invalidate_record(&self, expense: &Expense) {
        let scope = MutationScope::month(expense.user_id, expense.year, expense.month as u32);
        self.invalidator.invalidate(&scope, Domain::Expense).await;
        self.by_id
            .invalidate(&UserRecordId {
                user_id: expense.user_id,
                id: expense.id,
            })
            .await;
    }
}

// --- Loaders ---

struct TotalSpent;

#[async_trait]
impl Loader<Collection<Expense>, UserArgs> for TotalSpent {
    type Output = f64;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserArgs) -> Result<f64> {
        sum_of(expenses, doc! { "user_id": args.0 }).await
    }
}

struct UniqueYears;

#[async_trait]
impl Loader<Collection<Expense>, UserArgs> for UniqueYears {
    type Output = Vec<i32>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserArgs) -> Result<Vec<i32>> {
        let values = expenses.distinct("year", doc! { "user_id": args.0 }).await?;
        let years = values.iter().filter_map(|v| v.as_i32()).collect();
        Ok(years_or_current(years, chrono::Local::now().year()))
    }
}

struct LastExpenses;

#[async_trait]
impl Loader<Collection<Expense>, UserLimit> for LastExpenses {
    type Output = Vec<Expense>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserLimit) -> Result<Vec<Expense>> {
        let options = FindOptions::builder()
            .sort(newest_first())
            .limit(args.limit)
            .build();
        let cursor = expenses
            .find(doc! { "user_id": args.user_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

struct ExpenseById;

#[async_trait]
impl Loader<Collection<Expense>, UserRecordId> for ExpenseById {
    type Output = Option<Expense>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserRecordId) -> Result<Option<Expense>> {
        Ok(expenses
            .find_one(doc! { "_id": args.id, "user_id": args.user_id })
            .await?)
    }
}

struct ExpensesByDate;

#[async_trait]
impl Loader<Collection<Expense>, UserDate> for ExpensesByDate {
    type Output = Vec<Expense>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserDate) -> Result<Vec<Expense>> {
        let filter = doc! {
            "user_id": args.user_id,
            "year": args.date.year(),
            "month": args.date.month() as i32,
            "day": args.date.day() as i32,
        };
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let cursor = expenses.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }
}

struct DailyExpenses;

#[async_trait]
impl Loader<Collection<Expense>, UserMonth> for DailyExpenses {
    type Output = Vec<DailyCategoryTotal>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserMonth) -> Result<Vec<DailyCategoryTotal>> {
        let cursor = expenses.aggregate(daily_pipeline(args)).await?;
        decode_rows(cursor).await
    }
}

struct MonthlyExpenses;

#[async_trait]
impl Loader<Collection<Expense>, UserMonth> for MonthlyExpenses {
    type Output = Vec<CategoryTotal>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserMonth) -> Result<Vec<CategoryTotal>> {
        let cursor = expenses.aggregate(monthly_pipeline(args)).await?;
        decode_rows(cursor).await
    }
}

struct YearlyExpenses;

#[async_trait]
impl Loader<Collection<Expense>, UserYear> for YearlyExpenses {
    type Output = Vec<MonthlyCategoryTotal>;

    async fn load(&self, expenses: &Collection<Expense>, args: &UserYear) -> Result<Vec<MonthlyCategoryTotal>> {
        let cursor = expenses.aggregate(yearly_pipeline(args)).await?;
        decode_rows(cursor).await
    }
}

// --- Queries ---

/// Distinct years ascending; a user without expenses sees the current year.
fn years_or_current(mut years: Vec<i32>, current: i32) -> Vec<i32> {
    years.sort_unstable();
    if years.is_empty() {
        years.push(current);
    }
    years
}

pub(super) fn newest_first() -> Document {
    doc! { "year": -1, "month": -1, "day": -1, "created_at": -1 }
}

fn month_filter(args: &UserMonth) -> Document {
    doc! { "user_id": args.user_id, "year": args.year, "month": args.month as i32 }
}

fn daily_pipeline(args: &UserMonth) -> Vec<Document> {
    vec![
        doc! { "$match": month_filter(args) },
        doc! { "$group": {
            "_id": { "day": "$day", "category": "$category_name" },
            "total": { "$sum": "$amount" },
        } },
        doc! { "$project": { "_id": 0, "day": "$_id.day", "category": "$_id.category", "total": 1 } },
        doc! { "$sort": { "day": 1, "category": 1 } },
    ]
}

fn monthly_pipeline(args: &UserMonth) -> Vec<Document> {
    vec![
        doc! { "$match": month_filter(args) },
        doc! { "$group": { "_id": "$category_name", "total": { "$sum": "$amount" } } },
        doc! { "$project": { "_id": 0, "category": "$_id", "total": 1 } },
        doc! { "$sort": { "total": -1, "category": 1 } },
    ]
}

fn yearly_pipeline(args: &UserYear) -> Vec<Document> {
    vec![
        doc! { "$match": { "user_id": args.user_id, "year": args.year } },
        doc! { "$group": {
            "_id": { "month": "$month", "category": "$category_name" },
            "total": { "$sum": "$amount" },
        } },
        doc! { "$project": { "_id": 0, "month": "$_id.month", "category": "$_id.category", "total": 1 } },
        doc! { "$sort": { "month": 1, "category": 1 } },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> UserMonth {
        UserMonth {
            user_id: 42,
            year: 2024,
            month: 3,
        }
    }

    #[test]
    fn test_month_pipelines_match_the_users_month() {
        for pipeline in [daily_pipeline(&march()), monthly_pipeline(&march())] {
            let stage = pipeline[0].get_document("$match").unwrap();
            assert_eq!(stage.get_i64("user_id").unwrap(), 42);
            assert_eq!(stage.get_i32("year").unwrap(), 2024);
            assert_eq!(stage.get_i32("month").unwrap(), 3);
        }
    }

    #[test]
    fn test_daily_rows_are_grouped_by_day_and_category() {
        let pipeline = daily_pipeline(&march());
        let group = pipeline[1].get_document("$group").unwrap();
        let id = group.get_document("_id").unwrap();
        assert_eq!(id.get_str("day").unwrap(), "$day");
        assert_eq!(id.get_str("category").unwrap(), "$category_name");
    }

    #[test]
    fn test_yearly_pipeline_spans_the_whole_year() {
        let pipeline = yearly_pipeline(&UserYear { user_id: 42, year: 2024 });
        let stage = pipeline[0].get_document("$match").unwrap();
        assert!(!stage.contains_key("month"));
    }

    #[test]
    fn test_years_are_sorted() {
        assert_eq!(years_or_current(vec![2024, 2022, 2023], 2026), vec![2022, 2023, 2024]);
    }

    #[test]
    fn test_no_expenses_means_current_year() {
        assert_eq!(years_or_current(Vec::new(), 2026), vec![2026]);
    }

    #[test]
    fn test_row_decoding() {
        let row = doc! { "day": 5, "category": "Coffee", "total": 12.5 };
        let decoded: DailyCategoryTotal = mongodb::bson::from_document(row).unwrap();
        assert_eq!(
            decoded,
            DailyCategoryTotal {
                day: 5,
                category: "Coffee".into(),
                total: 12.5
            }
        );
    }
}
