//! Income models and aggregate rows.

use chrono::{Datelike, NaiveDate};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A recorded income.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Income {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: i64,
    pub day: i32,
    pub month: i32,
    pub year: i32,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
}

impl Income {
    pub fn new(user_id: i64, date: NaiveDate, amount: f64, description: Option<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            day: date.day() as i32,
            month: date.month() as i32,
            year: date.year(),
            amount,
            description,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Total of one day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayTotal {
    pub day: i32,
    pub total: f64,
}

/// Total of one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: i32,
    pub total: f64,
}
