//! Expense category models.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A user-defined expense category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: i64,
    pub name: String,
}

impl Category {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            name: name.into(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// Spending summary of one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub name: String,
    pub total_spent: f64,
    pub expense_count: u64,
    pub average_amount: f64,
}

impl CategoryStats {
    pub fn new(name: String, total_spent: f64, expense_count: u64) -> Self {
        let average_amount = if expense_count > 0 {
            total_spent / expense_count as f64
        } else {
            0.0
        };
        Self {
            name,
            total_spent,
            expense_count,
            average_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_empty_category_is_zero() {
        let stats = CategoryStats::new("Fuel".into(), 0.0, 0);
        assert_eq!(stats.average_amount, 0.0);
    }

    #[test]
    fn test_average_amount() {
        let stats = CategoryStats::new("Coffee".into(), 90.0, 3);
        assert_eq!(stats.average_amount, 30.0);
    }

    #[test]
    fn test_names_match_case_insensitively() {
        let category = Category::new(1, "Coffee");
        assert!(category.is_named(" coffee"));
        assert!(!category.is_named("tea"));
    }
}
