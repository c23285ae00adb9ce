//! Ledger validation errors.
//!
//! Returned inside `anyhow::Error` by repositories; handlers downcast to show
//! the message to the user.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Amount must be a positive number")]
    InvalidAmount,

    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    #[error("Category '{0}' already exists")]
    CategoryExists(String),

    #[error("Category not found")]
    UnknownCategory,

    #[error("Expenses of '{0}' have nowhere else to go, pick a target category")]
    CannotDeleteFallback(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Validate an amount entered by the user.
pub fn positive_amount(amount: f64) -> Result<f64, LedgerError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(LedgerError::InvalidAmount)
    }
}

/// Trim a category name, rejecting blank ones.
pub fn category_name(name: &str) -> Result<String, LedgerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::EmptyCategoryName);
    }
    Ok(name.to_string())
}

/// Trim a free-text description. Blank descriptions are dropped.
pub fn description(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        assert_eq!(positive_amount(12.5), Ok(12.5));
        assert_eq!(positive_amount(0.0), Err(LedgerError::InvalidAmount));
        assert_eq!(positive_amount(-3.0), Err(LedgerError::InvalidAmount));
        assert_eq!(positive_amount(f64::NAN), Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn test_category_name_is_trimmed() {
        assert_eq!(category_name("  Coffee ").as_deref(), Ok("Coffee"));
        assert_eq!(category_name("   "), Err(LedgerError::EmptyCategoryName));
    }

    #[test]
    fn test_blank_description_is_dropped() {
        assert_eq!(description(Some("  lunch ")), Some("lunch".to_string()));
        assert_eq!(description(Some("  ")), None);
        assert_eq!(description(None), None);
    }

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            LedgerError::CategoryExists("Fuel".into()).to_string(),
            "Category 'Fuel' already exists"
        );
        assert_eq!(LedgerError::NotFound("Expense").to_string(), "Expense not found");
    }
}
