//! Database module exports.

mod error;
mod models;
mod mongo;
mod repository;

pub use error::LedgerError;
pub use models::*;
pub use mongo::Database;
pub use repository::{CategoryRepository, ExpenseRepository, IncomeRepository, UserRepo};
