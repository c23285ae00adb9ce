//! Expense models and aggregate rows.

use chrono::{Datelike, NaiveDate};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A recorded expense.
///
/// The category name is denormalized so listings and aggregates need no join;
/// renaming or deleting a category rewrites it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: i64,
    pub day: i32,
    pub month: i32,
    pub year: i32,
    pub amount: f64,
    pub category_id: ObjectId,
    pub category_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl Expense {
    pub fn new(
        user_id: i64,
        date: NaiveDate,
        amount: f64,
        category_id: ObjectId,
        category_name: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            day: date.day() as i32,
            month: date.month() as i32,
            year: date.year(),
            amount,
            category_id,
            category_name,
            description,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Spending of one category on one day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyCategoryTotal {
    pub day: i32,
    pub category: String,
    pub total: f64,
}

/// Spending of one category over a period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Spending of one category in one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCategoryTotal {
    pub month: i32,
    pub category: String,
    pub total: f64,
}
