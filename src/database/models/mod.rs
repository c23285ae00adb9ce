//! Ledger data models.

pub mod category;
pub mod expense;
pub mod income;
pub mod user;

pub use category::{Category, CategoryStats};
pub use expense::{CategoryTotal, DailyCategoryTotal, Expense, MonthlyCategoryTotal};
pub use income::{DayTotal, Income, MonthTotal};
pub use user::{UserRecord, DEFAULT_CATEGORIES, FALLBACK_CATEGORY};
