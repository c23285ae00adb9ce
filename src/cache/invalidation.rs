//! Pattern-based invalidation coordinator.
//!
//! Writes call [`Invalidator::invalidate`] after they commit. The coordinator
//! turns the write's [`MutationScope`] into key patterns for every cached view
//! the write can make stale, then deletes whatever matches. When the scope
//! does not pin down a view's arguments, the whole user stem of that view is
//! dropped rather than guessing a narrower set.
//!
//! Failures are logged and counted, never returned: a write that committed
//! stays committed, and stale entries age out with their TTL.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use super::images::ReportImageCache;
use super::views::{self, CachedView, ScopeLevel};
use super::{CacheClient, CacheResult};

/// The (user, year, month) granularity touched by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationScope {
    user_id: i64,
    year: Option<i32>,
    month: Option<u32>,
}

impl MutationScope {
    /// Every period of a user.
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            year: None,
            month: None,
        }
    }

    /// One year of a user.
    pub fn year(user_id: i64, year: i32) -> Self {
        Self {
            user_id,
            year: Some(year),
            month: None,
        }
    }

    /// One month of a user.
    pub fn month(user_id: i64, year: i32, month: u32) -> Self {
        Self {
            user_id,
            year: Some(year),
            month: Some(month),
        }
    }

    /// Key segments after `prefix:operation` that this scope fixes for a view.
    fn stem_for(&self, view: &CachedView) -> String {
        let mut stem = format!("{}:{}", view.head(), self.user_id);
        match (view.level, self.year, self.month) {
            (ScopeLevel::User, _, _) | (_, None, _) => {}
            (ScopeLevel::Year, Some(year), _) | (ScopeLevel::Month, Some(year), None) => {
                stem.push_str(&format!(":{year}"));
            }
            (ScopeLevel::Month, Some(year), Some(month)) => {
                stem.push_str(&format!(":{year}:{month}"));
            }
        }
        stem
    }
}

impl fmt::Display for MutationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user={}", self.user_id)?;
        if let Some(year) = self.year {
            write!(f, " year={year}")?;
        }
        if let Some(month) = self.month {
            write!(f, " month={month}")?;
        }
        Ok(())
    }
}

/// Which kind of record a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Expense,
    Income,
    /// `reassigned` is set when the write moved or renamed expenses' category,
    /// which also makes every expense view of the user stale.
    Category { reassigned: bool },
}

/// A key pattern derived from a mutation scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvalidationPattern {
    /// A single key, deleted without scanning.
    Exact(String),
    /// A glob with `*` wildcards, resolved with SCAN.
    Glob(String),
}

impl InvalidationPattern {
    pub fn exact(key: impl Into<String>) -> Self {
        Self::Exact(key.into())
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(key) | Self::Glob(key) => key,
        }
    }

    /// Delete every key this pattern covers. Absent keys are not an error.
    pub async fn delete(&self, client: &CacheClient) -> CacheResult<u64> {
        match self {
            Self::Exact(key) => Ok(u64::from(client.delete(key).await?)),
            Self::Glob(pattern) => client.delete_matching(pattern).await,
        }
    }
}

impl fmt::Display for InvalidationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one invalidation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    pub patterns: usize,
    pub deleted: u64,
    pub failures: usize,
}

impl InvalidationReport {
    pub fn is_complete(&self) -> bool {
        self.failures == 0
    }
}

/// Patterns covering every key of `view` within `scope`: the exact stem and
/// everything below it.
fn view_patterns(view: &CachedView, scope: &MutationScope) -> [InvalidationPattern; 2] {
    let stem = scope.stem_for(view);
    [
        InvalidationPattern::glob(format!("{stem}:*")),
        InvalidationPattern::exact(stem),
    ]
}

/// Coordinates cache invalidation after writes.
#[derive(Debug, Clone)]
pub struct Invalidator {
    client: CacheClient,
}

impl Invalidator {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Every pattern a write of `domain` at `scope` must clear, views first,
    /// report images last.
    pub fn patterns(scope: &MutationScope, domain: Domain) -> Vec<InvalidationPattern> {
        let user_scope = MutationScope::user(scope.user_id);

        let mut patterns: Vec<InvalidationPattern> = match domain {
            Domain::Expense => Self::views_patterns(views::EXPENSE_VIEWS, scope),
            Domain::Income => Self::views_patterns(views::INCOME_VIEWS, scope),
            Domain::Category { reassigned: false } => {
                Self::views_patterns(views::CATEGORY_VIEWS, &user_scope)
            }
            Domain::Category { reassigned: true } => {
                let mut patterns = Self::views_patterns(views::CATEGORY_VIEWS, &user_scope);
                patterns.extend(Self::views_patterns(views::EXPENSE_VIEWS, &user_scope));
                patterns.extend(view_patterns(&views::EXPENSE_BY_ID, &user_scope));
                patterns
            }
        };

        match domain {
            Domain::Expense | Domain::Income => {
                patterns.extend(ReportImageCache::patterns(scope.user_id, scope.year, scope.month));
            }
            Domain::Category { reassigned: true } => {
                patterns.extend(ReportImageCache::patterns(scope.user_id, None, None));
            }
            Domain::Category { reassigned: false } => {}
        }

        // Category cascades list some views twice
        let mut seen = HashSet::new();
        patterns.retain(|pattern| seen.insert(pattern.clone()));
        patterns
    }

    fn views_patterns(list: &[CachedView], scope: &MutationScope) -> Vec<InvalidationPattern> {
        list.iter().flat_map(|view| view_patterns(view, scope)).collect()
    }

    /// Invalidate everything a committed write of `domain` at `scope` can have
    /// made stale.
    pub async fn invalidate(&self, scope: &MutationScope, domain: Domain) -> InvalidationReport {
        let patterns = Self::patterns(scope, domain);
        let report = self.run(&patterns).await;
        debug!(
            scope = %scope,
            domain = ?domain,
            patterns = report.patterns,
            deleted = report.deleted,
            failures = report.failures,
            "Cache invalidated"
        );
        report
    }

    /// Drop every cached view and report image of a user, in every domain.
    pub async fn invalidate_user(&self, user_id: i64) -> InvalidationReport {
        let scope = MutationScope::user(user_id);
        let mut patterns = Self::views_patterns(views::ALL_VIEWS, &scope);
        patterns.extend(ReportImageCache::patterns(user_id, None, None));

        let report = self.run(&patterns).await;
        info!(user_id, deleted = report.deleted, failures = report.failures, "All user caches invalidated");
        report
    }

    async fn run(&self, patterns: &[InvalidationPattern]) -> InvalidationReport {
        delete_patterns(&self.client, patterns).await
    }
}

/// Delete each pattern in turn. A failing pattern does not stop the rest.
pub(super) async fn delete_patterns(client: &CacheClient, patterns: &[InvalidationPattern]) -> InvalidationReport {
    let mut report = InvalidationReport {
        patterns: patterns.len(),
        ..Default::default()
    };

    for pattern in patterns {
        match pattern.delete(client).await {
            Ok(deleted) => report.deleted += deleted,
            Err(e) => {
                report.failures += 1;
                warn!(pattern = %pattern, error = %e, "Cache invalidation failed, entries will expire by TTL");
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::client::testing::DownStore;
    use crate::cache::images::{ImageKey, ReportKind};
    use crate::cache::key::{build_key, KeyArgs};
    use crate::cache::MemoryStore;

    const TTL: Duration = Duration::from_secs(300);
    const U: i64 = 42;

    struct Fixture {
        client: CacheClient,
        invalidator: Invalidator,
    }

    impl Fixture {
        fn new() -> Self {
            let client = CacheClient::new(MemoryStore::default());
            Self {
                invalidator: Invalidator::new(client.clone()),
                client,
            }
        }

        async fn put(&self, view: &CachedView, args: KeyArgs) -> String {
            let key = build_key(view.prefix, view.operation, &args);
            self.client.set(&key, b"[]", TTL).await.unwrap();
            key
        }

        async fn present(&self, key: &str) -> bool {
            self.client.get(key).await.unwrap().is_some()
        }

        async fn keys(&self) -> Vec<String> {
            let mut keys = self.client.scan("*").await.unwrap();
            keys.sort();
            keys
        }
    }

    fn user(u: i64) -> KeyArgs {
        KeyArgs::new().arg(u)
    }

    fn year(u: i64, y: i32) -> KeyArgs {
        KeyArgs::new().arg(u).arg(y)
    }

    fn month(u: i64, y: i32, m: u32) -> KeyArgs {
        KeyArgs::new().arg(u).arg(y).arg(m)
    }

    #[tokio::test]
    async fn test_add_expense_scenario() {
        let fx = Fixture::new();
        let yearly = fx.put(&views::YEARLY_EXPENSES, year(U, 2024)).await;
        let monthly = fx.put(&views::MONTHLY_EXPENSES, month(U, 2024, 3)).await;
        let daily = fx.put(&views::DAILY_EXPENSES, month(U, 2024, 3)).await;
        let by_date = fx.put(&views::EXPENSES_BY_DATE, month(U, 2024, 3).arg(15)).await;
        let total = fx.put(&views::TOTAL_SPENT, user(U)).await;
        let last = fx.put(&views::LAST_EXPENSES, user(U).kwarg("limit", 5)).await;

        let other_month = fx.put(&views::MONTHLY_EXPENSES, month(U, 2024, 4)).await;
        let other_year = fx.put(&views::YEARLY_EXPENSES, year(U, 2023)).await;
        let income = fx.put(&views::TOTAL_INCOME, user(U)).await;

        let report = fx
            .invalidator
            .invalidate(&MutationScope::month(U, 2024, 3), Domain::Expense)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.deleted, 6);
        for key in [&yearly, &monthly, &daily, &by_date, &total, &last] {
            assert!(!fx.present(key).await, "{key} should be invalidated");
        }
        for key in [&other_month, &other_year, &income] {
            assert!(fx.present(key).await, "{key} should survive");
        }
    }

    #[tokio::test]
    async fn test_month_scope_does_not_touch_other_users() {
        let fx = Fixture::new();
        // 4 and 420 share digits with 42; 2024 looks like a year
        let neighbours = [4_i64, 420, 2024, 142];
        let mut survivors = Vec::new();
        for other in neighbours {
            survivors.push(fx.put(&views::YEARLY_EXPENSES, year(other, 2024)).await);
            survivors.push(fx.put(&views::MONTHLY_EXPENSES, month(other, 2024, 3)).await);
            survivors.push(fx.put(&views::DAILY_EXPENSES, month(other, 2024, 3)).await);
            survivors.push(fx.put(&views::TOTAL_SPENT, user(other)).await);
        }
        // User 2024 spending in "year" 42 must not be mistaken for user 42
        survivors.push(fx.put(&views::MONTHLY_EXPENSES, month(2024, 42, 3)).await);

        fx.invalidator
            .invalidate(&MutationScope::month(U, 2024, 3), Domain::Expense)
            .await;
        fx.invalidator.invalidate(&MutationScope::user(U), Domain::Expense).await;

        for key in &survivors {
            assert!(fx.present(key).await, "{key} belongs to another user");
        }
    }

    #[tokio::test]
    async fn test_month_one_does_not_match_months_ten_to_twelve() {
        let fx = Fixture::new();
        let january = fx.put(&views::DAILY_EXPENSES, month(U, 2024, 1)).await;
        let october = fx.put(&views::DAILY_EXPENSES, month(U, 2024, 10)).await;

        fx.invalidator
            .invalidate(&MutationScope::month(U, 2024, 1), Domain::Expense)
            .await;

        assert!(!fx.present(&january).await);
        assert!(fx.present(&october).await);
    }

    #[tokio::test]
    async fn test_user_scope_widens_to_every_period() {
        let fx = Fixture::new();
        for key_args in [month(U, 2023, 12), month(U, 2024, 3)] {
            fx.put(&views::MONTHLY_EXPENSES, key_args.clone()).await;
            fx.put(&views::DAILY_EXPENSES, key_args.clone()).await;
            fx.put(&views::EXPENSES_BY_DATE, key_args.arg(1)).await;
        }
        fx.put(&views::YEARLY_EXPENSES, year(U, 2022)).await;
        fx.put(&views::UNIQUE_YEARS, user(U)).await;

        fx.invalidator.invalidate(&MutationScope::user(U), Domain::Expense).await;

        assert!(fx.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_year_scope_widens_month_views_to_the_year() {
        let fx = Fixture::new();
        let march = fx.put(&views::DAILY_INCOME, month(U, 2024, 3)).await;
        let july = fx.put(&views::DAILY_INCOME, month(U, 2024, 7)).await;
        let monthly = fx.put(&views::MONTHLY_INCOME, year(U, 2024)).await;
        let last_year = fx.put(&views::DAILY_INCOME, month(U, 2023, 3)).await;

        fx.invalidator.invalidate(&MutationScope::year(U, 2024), Domain::Income).await;

        assert!(!fx.present(&march).await);
        assert!(!fx.present(&july).await);
        assert!(!fx.present(&monthly).await);
        assert!(fx.present(&last_year).await);
    }

    #[tokio::test]
    async fn test_whole_user_invalidation_spans_every_namespace() {
        let fx = Fixture::new();
        for view in views::ALL_VIEWS {
            let args = match view.level {
                ScopeLevel::User => user(U).arg("x"),
                ScopeLevel::Year => year(U, 2024),
                ScopeLevel::Month => month(U, 2024, 5),
            };
            fx.put(view, args).await;
        }
        let image = ImageKey::new(ReportKind::Yearly, U, 2024, None).to_string();
        fx.client.set(&image, b"svg", TTL).await.unwrap();
        let stranger = fx.put(&views::USER_CATEGORIES, user(7)).await;

        let report = fx.invalidator.invalidate_user(U).await;

        assert_eq!(report.deleted, views::ALL_VIEWS.len() as u64 + 1);
        assert_eq!(fx.keys().await, vec![stranger]);
    }

    #[tokio::test]
    async fn test_category_delete_with_reassignment() {
        let fx = Fixture::new();
        let list = fx.put(&views::USER_CATEGORIES, user(U)).await;
        let old_stats = fx.put(&views::CATEGORY_STATS, user(U).arg("old")).await;
        let new_stats = fx.put(&views::CATEGORY_STATS, user(U).arg("other")).await;
        let lookup = fx.put(&views::CATEGORY_BY_ID, user(U).arg("old")).await;
        let monthly = fx.put(&views::MONTHLY_EXPENSES, month(U, 2021, 6)).await;
        let total = fx.put(&views::TOTAL_SPENT, user(U)).await;
        let record = fx.put(&views::EXPENSE_BY_ID, user(U).arg("e1")).await;
        let income = fx.put(&views::TOTAL_INCOME, user(U)).await;

        fx.invalidator
            .invalidate(&MutationScope::user(U), Domain::Category { reassigned: true })
            .await;

        for key in [&list, &old_stats, &new_stats, &lookup, &monthly, &total, &record] {
            assert!(!fx.present(key).await, "{key} should be invalidated");
        }
        assert!(fx.present(&income).await);
    }

    #[tokio::test]
    async fn test_plain_category_write_keeps_expense_views() {
        let fx = Fixture::new();
        let list = fx.put(&views::USER_CATEGORIES, user(U)).await;
        let total = fx.put(&views::TOTAL_SPENT, user(U)).await;

        fx.invalidator
            .invalidate(&MutationScope::user(U), Domain::Category { reassigned: false })
            .await;

        assert!(!fx.present(&list).await);
        assert!(fx.present(&total).await);
    }

    #[tokio::test]
    async fn test_expense_write_drops_report_images() {
        let fx = Fixture::new();
        let daily = ImageKey::new(ReportKind::Daily, U, 2024, Some(3)).to_string();
        let yearly = ImageKey::new(ReportKind::Yearly, U, 2024, None).to_string();
        let other = ImageKey::new(ReportKind::Daily, U, 2024, Some(4)).to_string();
        for key in [&daily, &yearly, &other] {
            fx.client.set(key, b"svg", TTL).await.unwrap();
        }

        fx.invalidator
            .invalidate(&MutationScope::month(U, 2024, 3), Domain::Income)
            .await;

        assert!(!fx.present(&daily).await);
        assert!(!fx.present(&yearly).await);
        assert!(fx.present(&other).await);
    }

    #[tokio::test]
    async fn test_invalidation_is_idempotent() {
        let fx = Fixture::new();
        fx.put(&views::MONTHLY_EXPENSES, month(U, 2024, 3)).await;
        fx.put(&views::TOTAL_SPENT, user(U)).await;
        let keep = fx.put(&views::MONTHLY_EXPENSES, month(U, 2024, 4)).await;
        let scope = MutationScope::month(U, 2024, 3);

        let first = fx.invalidator.invalidate(&scope, Domain::Expense).await;
        let after_first = fx.keys().await;
        let second = fx.invalidator.invalidate(&scope, Domain::Expense).await;

        assert_eq!(first.deleted, 2);
        assert_eq!(second.deleted, 0);
        assert!(second.is_complete());
        assert_eq!(fx.keys().await, after_first);
        assert_eq!(after_first, vec![keep]);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_raised() {
        let invalidator = Invalidator::new(CacheClient::new(DownStore));
        let scope = MutationScope::month(U, 2024, 3);

        let report = invalidator.invalidate(&scope, Domain::Expense).await;

        assert_eq!(report.patterns, Invalidator::patterns(&scope, Domain::Expense).len());
        assert_eq!(report.failures, report.patterns);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_pattern_shapes() {
        let patterns = Invalidator::patterns(&MutationScope::month(U, 2024, 3), Domain::Expense);
        let rendered: Vec<&str> = patterns.iter().map(InvalidationPattern::as_str).collect();

        assert!(rendered.contains(&"total_spent:get_total_spent:42"));
        assert!(rendered.contains(&"yearly_expenses:get_yearly_expenses:42:2024"));
        assert!(rendered.contains(&"monthly_expenses:get_monthly_expenses:42:2024:3"));
        assert!(rendered.contains(&"expenses_by_date:get_expenses_by_date:42:2024:3:*"));
        assert!(rendered.contains(&"report_image:yearly:42:2024"));
        assert!(!rendered.iter().any(|p| p.starts_with("categories:")));
    }
}
