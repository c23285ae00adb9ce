//! Catalog of cached views.
//!
//! Readers build their keys from these declarations and the invalidation
//! coordinator derives its patterns from the same declarations, so both sides
//! agree on the key layout. Every view takes the user id as its first
//! positional argument; `level` says how many of the following arguments are
//! year and month.

/// Which leading positional arguments of a view identify its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeLevel {
    /// `(user, ...)`
    User,
    /// `(user, year, ...)`
    Year,
    /// `(user, year, month, ...)`
    Month,
}

/// A cached read operation and the shape of its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CachedView {
    pub prefix: &'static str,
    pub operation: &'static str,
    pub level: ScopeLevel,
}

impl CachedView {
    pub const fn new(prefix: &'static str, operation: &'static str, level: ScopeLevel) -> Self {
        Self {
            prefix,
            operation,
            level,
        }
    }

    /// `prefix:operation`, the fixed head of every key of this view.
    pub fn head(&self) -> String {
        format!("{}:{}", self.prefix, self.operation)
    }
}

// Expenses
pub const TOTAL_SPENT: CachedView = CachedView::new("total_spent", "get_total_spent", ScopeLevel::User);
pub const UNIQUE_YEARS: CachedView = CachedView::new("unique_years", "get_unique_years", ScopeLevel::User);
pub const LAST_EXPENSES: CachedView = CachedView::new("last_expenses", "get_last_expenses", ScopeLevel::User);
pub const EXPENSE_BY_ID: CachedView = CachedView::new("expense", "get_expense_by_id", ScopeLevel::User);
pub const YEARLY_EXPENSES: CachedView = CachedView::new("yearly_expenses", "get_yearly_expenses", ScopeLevel::Year);
pub const MONTHLY_EXPENSES: CachedView = CachedView::new("monthly_expenses", "get_monthly_expenses", ScopeLevel::Month);
pub const DAILY_EXPENSES: CachedView = CachedView::new("daily_expenses", "get_daily_expenses", ScopeLevel::Month);
pub const EXPENSES_BY_DATE: CachedView = CachedView::new("expenses_by_date", "get_expenses_by_date", ScopeLevel::Month);

// Incomes
pub const TOTAL_INCOME: CachedView = CachedView::new("total_income", "get_total_income", ScopeLevel::User);
pub const LAST_INCOMES: CachedView = CachedView::new("last_incomes", "get_last_incomes", ScopeLevel::User);
pub const MONTHLY_INCOME: CachedView = CachedView::new("monthly_income", "get_monthly_incomes", ScopeLevel::Year);
pub const DAILY_INCOME: CachedView = CachedView::new("daily_income", "get_daily_incomes", ScopeLevel::Month);
pub const INCOMES_BY_DATE: CachedView = CachedView::new("incomes_by_date", "get_incomes_by_date", ScopeLevel::Month);

// Categories
pub const USER_CATEGORIES: CachedView = CachedView::new("categories", "get_user_categories", ScopeLevel::User);
pub const CATEGORY_BY_ID: CachedView = CachedView::new("category", "get_category_by_id", ScopeLevel::User);
pub const CATEGORY_STATS: CachedView = CachedView::new("category_stats", "get_category_statistics", ScopeLevel::User);

pub const EXPENSE_VIEWS: &[CachedView] = &[
    TOTAL_SPENT,
    UNIQUE_YEARS,
    LAST_EXPENSES,
    YEARLY_EXPENSES,
    MONTHLY_EXPENSES,
    DAILY_EXPENSES,
    EXPENSES_BY_DATE,
    // Per-category totals move with every expense write
    CATEGORY_STATS,
];

pub const INCOME_VIEWS: &[CachedView] = &[
    TOTAL_INCOME,
    LAST_INCOMES,
    MONTHLY_INCOME,
    DAILY_INCOME,
    INCOMES_BY_DATE,
];

pub const CATEGORY_VIEWS: &[CachedView] = &[USER_CATEGORIES, CATEGORY_BY_ID, CATEGORY_STATS];

/// Every catalogued view, including single-record lookups that writes drop by
/// exact key.
pub const ALL_VIEWS: &[CachedView] = &[
    TOTAL_SPENT,
    UNIQUE_YEARS,
    LAST_EXPENSES,
    EXPENSE_BY_ID,
    YEARLY_EXPENSES,
    MONTHLY_EXPENSES,
    DAILY_EXPENSES,
    EXPENSES_BY_DATE,
    TOTAL_INCOME,
    LAST_INCOMES,
    MONTHLY_INCOME,
    DAILY_INCOME,
    INCOMES_BY_DATE,
    USER_CATEGORIES,
    CATEGORY_BY_ID,
    CATEGORY_STATS,
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_heads_are_unique() {
        let heads: HashSet<String> = ALL_VIEWS.iter().map(CachedView::head).collect();
        assert_eq!(heads.len(), ALL_VIEWS.len());
    }

    #[test]
    fn test_no_delimiter_inside_identity() {
        for view in ALL_VIEWS {
            assert!(!view.prefix.contains(':'), "{}", view.prefix);
            assert!(!view.operation.contains(':'), "{}", view.operation);
        }
    }

    #[test]
    fn test_domain_lists_are_catalogued() {
        for view in EXPENSE_VIEWS.iter().chain(INCOME_VIEWS).chain(CATEGORY_VIEWS) {
            assert!(ALL_VIEWS.contains(view));
        }
    }
}
