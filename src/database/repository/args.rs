//! Identifying arguments of cached ledger reads.
//!
//! The user id always comes first so that invalidation patterns anchored on
//! `prefix:operation:user` cover every key of that user. Year and month follow
//! for period-scoped views.

use chrono::{Datelike, NaiveDate};
use mongodb::bson::oid::ObjectId;

use crate::cache::{CacheArgs, KeyArgs};

/// `(user)`
#[derive(Debug, Clone, Copy)]
pub struct UserArgs(pub i64);

impl CacheArgs for UserArgs {
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new().arg(self.0)
    }
}

/// `(user, year)`
#[derive(Debug, Clone, Copy)]
pub struct UserYear {
    pub user_id: i64,
    pub year: i32,
}

impl CacheArgs for UserYear {
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new().arg(self.user_id).arg(self.year)
    }
}

/// `(user, year, month)`
#[derive(Debug, Clone, Copy)]
pub struct UserMonth {
    pub user_id: i64,
    pub year: i32,
    pub month: u32,
}

impl CacheArgs for UserMonth {
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new().arg(self.user_id).arg(self.year).arg(self.month)
    }
}

/// `(user, year, month, day)`
#[derive(Debug, Clone, Copy)]
pub struct UserDate {
    pub user_id: i64,
    pub date: NaiveDate,
}

impl CacheArgs for UserDate {
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new()
            .arg(self.user_id)
            .arg(self.date.year())
            .arg(self.date.month())
            .arg(self.date.day())
    }
}

/// `(user, limit=N)`
#[derive(Debug, Clone, Copy)]
pub struct UserLimit {
    pub user_id: i64,
    pub limit: i64,
}

impl UserLimit {
    pub const DEFAULT_LIMIT: i64 = 5;

    pub fn latest(user_id: i64) -> Self {
        Self {
            user_id,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl CacheArgs for UserLimit {
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new().arg(self.user_id).kwarg("limit", self.limit)
    }
}

/// `(user, record id)`
#[derive(Debug, Clone, Copy)]
pub struct UserRecordId {
    pub user_id: i64,
    pub id: ObjectId,
}

impl CacheArgs for UserRecordId {
    fn key_args(&self) -> KeyArgs {
        KeyArgs::new().arg(self.user_id).arg(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{views, CacheConfig};

    #[test]
    fn test_period_arguments_follow_the_user() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let key = CacheConfig::by_date(&views::EXPENSES_BY_DATE).key(&UserDate { user_id: 42, date }.key_args());
        assert_eq!(key, "expenses_by_date:get_expenses_by_date:42:2024:3:7");
    }

    #[test]
    fn test_limit_is_a_keyword() {
        let key = CacheConfig::recent(&views::LAST_EXPENSES).key(&UserLimit::latest(42).key_args());
        assert_eq!(key, "last_expenses:get_last_expenses:42:limit:5");
    }
}
