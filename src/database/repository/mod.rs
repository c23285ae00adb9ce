//! Repository module - one repository per collection.
//!
//! Reads go through [`Cached`](crate::cache::Cached) loaders whose context is
//! the collection handle; writes invalidate through the cache
//! [`Invalidator`](crate::cache::Invalidator) once the database accepted them.

mod args;
mod category_repository;
mod expense_repository;
mod income_repository;
mod user_repository;

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Cursor};
use serde::de::DeserializeOwned;

pub use category_repository::CategoryRepository;
pub use expense_repository::ExpenseRepository;
pub use income_repository::IncomeRepository;
pub use user_repository::UserRepo;

/// Sum of `amount` over the documents matching `filter`. Zero when none match.
async fn sum_of<T: Send + Sync>(collection: &Collection<T>, filter: Document) -> Result<f64> {
    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$group": { "_id": null, "total": { "$sum": "$amount" } } },
    ];
    let rows: Vec<Document> = collection.aggregate(pipeline).await?.try_collect().await?;
    Ok(rows
        .first()
        .and_then(|row| row.get_f64("total").ok())
        .unwrap_or(0.0))
}

/// Decode aggregation output into typed rows.
async fn decode_rows<T: DeserializeOwned>(cursor: Cursor<Document>) -> Result<Vec<T>> {
    let docs: Vec<Document> = cursor.try_collect().await?;
    docs.into_iter()
        .map(|doc| mongodb::bson::from_document(doc).map_err(anyhow::Error::from))
        .collect()
}
