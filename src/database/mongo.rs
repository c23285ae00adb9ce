//! MongoDB connection.

use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

/// Handle to the ledger database.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect and verify the server answers a ping.
    ///
    /// # Errors
    /// Returns error if the URI is invalid or the server is unreachable.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!(database = db_name, "Connected to MongoDB");

        let db = client.database(db_name);
        Ok(Self { db })
    }

    /// Create the indexes the ledger queries rely on. Existing indexes are kept.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        for name in ["expenses", "incomes"] {
            let collection: Collection<Document> = self.collection(name);
            let models = [
                doc! { "user_id": 1, "year": 1 },
                doc! { "user_id": 1, "year": 1, "month": 1 },
                doc! { "user_id": 1, "year": 1, "month": 1, "day": 1 },
            ]
            .into_iter()
            .map(|keys| IndexModel::builder().keys(keys).build());
            collection.create_indexes(models).await?;
        }

        let expenses: Collection<Document> = self.collection("expenses");
        expenses
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "category_id": 1 }).build())
            .await?;

        let categories: Collection<Document> = self.collection("categories");
        categories
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "name": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;

        info!("Database indexes ensured");
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
