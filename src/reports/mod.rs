//! Report service - charts and balance built from the cached aggregates.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::cache::{ImageKey, ReportImageCache, ReportKind};
use crate::charts;
use crate::database::{ExpenseRepository, IncomeRepository};

/// Income, spending and what is left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub income: f64,
    pub spent: f64,
}

impl Balance {
    pub fn remaining(&self) -> f64 {
        self.income - self.spent
    }
}

/// Builds report charts, serving them from the image cache when possible.
pub struct ReportService {
    expenses: Arc<ExpenseRepository>,
    incomes: Arc<IncomeRepository>,
    images: ReportImageCache,
    currency: String,
}

impl ReportService {
    pub fn new(
        expenses: Arc<ExpenseRepository>,
        incomes: Arc<IncomeRepository>,
        images: ReportImageCache,
        currency: String,
    ) -> Self {
        Self {
            expenses,
            incomes,
            images,
            currency,
        }
    }

    pub async fn balance(&self, user_id: i64) -> Result<Balance> {
        let (income, spent) = tokio::try_join!(self.incomes.total(user_id), self.expenses.total_spent(user_id))?;
        Ok(Balance { income, spent })
    }

    /// Day-by-day income against expenses for one month.
    pub async fn daily_chart(&self, user_id: i64, year: i32, month: u32) -> Result<Vec<u8>> {
        let key = ImageKey::new(ReportKind::Daily, user_id, year, Some(month));
        render_cached(&self.images, &key, || async move {
            let (incomes, expenses) = tokio::try_join!(
                self.incomes.daily(user_id, year, month),
                self.expenses.daily(user_id, year, month)
            )?;
            Ok(charts::daily_report(year, month, &incomes, &expenses, &self.currency))
        })
        .await
    }

    /// Month-by-month income against expenses for one year.
    pub async fn monthly_chart(&self, user_id: i64, year: i32) -> Result<Vec<u8>> {
        let key = ImageKey::new(ReportKind::Monthly, user_id, year, None);
        render_cached(&self.images, &key, || async move {
            let (incomes, expenses) = tokio::try_join!(
                self.incomes.monthly(user_id, year),
                self.expenses.yearly(user_id, year)
            )?;
            Ok(charts::monthly_report(year, &incomes, &expenses, &self.currency))
        })
        .await
    }

    /// Spending per category for one year.
    pub async fn yearly_chart(&self, user_id: i64, year: i32) -> Result<Vec<u8>> {
        let key = ImageKey::new(ReportKind::Yearly, user_id, year, None);
        render_cached(&self.images, &key, || async move {
            let expenses = self.expenses.yearly(user_id, year).await?;
            Ok(charts::yearly_report(year, &expenses, &self.currency))
        })
        .await
    }
}

/// Serve `key` from the image cache, rendering and storing it on a miss.
///
/// A failed store write still returns the rendered image.
async fn render_cached<F, Fut>(images: &ReportImageCache, key: &ImageKey, render: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if let Some(bytes) = images.get(key).await {
        return Ok(bytes);
    }

    let bytes = render().await?.into_bytes();
    match images.put(key, &bytes, images.ttl()).await {
        Ok(()) => debug!(key = %key, size = bytes.len(), "Report image cached"),
        Err(e) => warn!(key = %key, error = %e, "Report image not cached"),
    }
    Ok(bytes)
}
