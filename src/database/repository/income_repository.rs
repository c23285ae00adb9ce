//! Income repository.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use tracing::debug;

use super::args::{UserArgs, UserDate, UserLimit, UserMonth, UserYear};
use super::expense_repository::newest_first;
use super::{decode_rows, sum_of};
use crate::cache::{views, CacheClient, CacheConfig, Cached, Domain, Invalidator, Loader, MutationScope};
use crate::database::error::{description, positive_amount};
use crate::database::models::{DayTotal, Income, MonthTotal};
use crate::database::Database;

/// Repository for incomes.
pub struct IncomeRepository {
    collection: Collection<Income>,
    invalidator: Invalidator,

    total: Cached<TotalIncome>,
    last: Cached<LastIncomes>,
    by_date: Cached<IncomesByDate>,
    daily: Cached<DailyIncomes>,
    monthly: Cached<MonthlyIncomes>,
}

impl IncomeRepository {
    pub fn new(db: &Database, cache: &CacheClient) -> Self {
        Self {
            collection: db.collection("incomes"),
            invalidator: Invalidator::new(cache.clone()),
            total: Cached::new(cache.clone(), CacheConfig::aggregate(&views::TOTAL_INCOME), TotalIncome),
            last: Cached::new(cache.clone(), CacheConfig::recent(&views::LAST_INCOMES), LastIncomes),
            by_date: Cached::new(cache.clone(), CacheConfig::by_date(&views::INCOMES_BY_DATE), IncomesByDate),
            daily: Cached::new(cache.clone(), CacheConfig::by_date(&views::DAILY_INCOME), DailyIncomes),
            monthly: Cached::new(cache.clone(), CacheConfig::aggregate(&views::MONTHLY_INCOME), MonthlyIncomes),
        }
    }

    pub async fn total(&self, user_id: i64) -> Result<f64> {
        self.total.get(&self.collection, &UserArgs(user_id)).await
    }

    pub async fn last(&self, user_id: i64, limit: i64) -> Result<Vec<Income>> {
        self.last.get(&self.collection, &UserLimit { user_id, limit }).await
    }

    pub async fn by_date(&self, user_id: i64, date: NaiveDate) -> Result<Vec<Income>> {
        self.by_date.get(&self.collection, &UserDate { user_id, date }).await
    }

    /// Per-day totals of a month.
    pub async fn daily(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<DayTotal>> {
        self.daily.get(&self.collection, &UserMonth { user_id, year, month }).await
    }

    /// Per-month totals of a year.
    pub async fn monthly(&self, user_id: i64, year: i32) -> Result<Vec<MonthTotal>> {
        self.monthly.get(&self.collection, &UserYear { user_id, year }).await
    }

    pub async fn add(&self, user_id: i64, date: NaiveDate, amount: f64, note: Option<&str>) -> Result<Income> {
        let amount = positive_amount(amount)?;
        let income = Income::new(user_id, date, amount, description(note));
        self.collection.insert_one(&income).await?;
        debug!(user_id, income_id = %income.id, amount, "Income added");

        self.invalidator
            .invalidate(&MutationScope::month(user_id, date.year(), date.month()), Domain::Income)
            .await;
        Ok(income)
    }

    /// Delete an income of the user. Returns `false` when there is none.
    pub async fn delete(&self, user_id: i64, id: ObjectId) -> Result<bool> {
        let Some(income) = self
            .collection
            .find_one_and_delete(doc! { "_id": id, "user_id": user_id })
            .await?
        else {
            return Ok(false);
        };
        debug!(user_id, income_id = %id, "Income deleted");

        let scope = MutationScope::month(user_id, income.year, income.month as u32);
        self.invalidator.invalidate(&scope, Domain::Income).await;
        Ok(true)
    }
}

// --- Loaders ---

struct TotalIncome;

#[async_trait]
impl Loader<Collection<Income>, UserArgs> for TotalIncome {
    type Output = f64;

    async fn load(&self, incomes: &Collection<Income>, args: &UserArgs) -> Result<f64> {
        sum_of(incomes, doc! { "user_id": args.0 }).await
    }
}

struct LastIncomes;

#[async_trait]
impl Loader<Collection<Income>, UserLimit> for LastIncomes {
    type Output = Vec<Income>;

    async fn load(&self, incomes: &Collection<Income>, args: &UserLimit) -> Result<Vec<Income>> {
        let options = FindOptions::builder()
            .sort(newest_first())
            .limit(args.limit)
            .build();
        let cursor = incomes
            .find(doc! { "user_id": args.user_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

struct IncomesByDate;

#[async_trait]
impl Loader<Collection<Income>, UserDate> for IncomesByDate {
    type Output = Vec<Income>;

    async fn load(&self, incomes: &Collection<Income>, args: &UserDate) -> Result<Vec<Income>> {
        let filter = doc! {
            "user_id": args.user_id,
            "year": args.date.year(),
            "month": args.date.month() as i32,
            "day": args.date.day() as i32,
        };
        let cursor = incomes.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }
}

struct DailyIncomes;

#[async_trait]
impl Loader<Collection<Income>, UserMonth> for DailyIncomes {
    type Output = Vec<DayTotal>;

    async fn load(&self, incomes: &Collection<Income>, args: &UserMonth) -> Result<Vec<DayTotal>> {
        let filter = doc! { "user_id": args.user_id, "year": args.year, "month": args.month as i32 };
        let cursor = incomes.aggregate(totals_by("day", filter)).await?;
        decode_rows(cursor).await
    }
}

struct MonthlyIncomes;

#[async_trait]
impl Loader<Collection<Income>, UserYear> for MonthlyIncomes {
    type Output = Vec<MonthTotal>;

    async fn load(&self, incomes: &Collection<Income>, args: &UserYear) -> Result<Vec<MonthTotal>> {
        let filter = doc! { "user_id": args.user_id, "year": args.year };
        let cursor = incomes.aggregate(totals_by("month", filter)).await?;
        decode_rows(cursor).await
    }
}

/// Totals grouped by one date field, ascending.
fn totals_by(field: &str, filter: Document) -> Vec<Document> {
    vec![
        doc! { "$match": filter },
        doc! { "$group": { "_id": format!("${field}"), "total": { "$sum": "$amount" } } },
        doc! { "$project": { "_id": 0, field: "$_id", "total": 1 } },
        doc! { "$sort": { field: 1 } },
    ]
}
