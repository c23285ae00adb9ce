//! Bot user model.

use serde::{Deserialize, Serialize};

/// Categories every new user starts with. The last one doubles as the
/// fallback that receives expenses of deleted categories.
pub const DEFAULT_CATEGORIES: [&str; 6] = ["Groceries", "Fuel", "Coffee", "Restaurants", "Education", FALLBACK_CATEGORY];

/// Category that collects expenses of deleted categories.
pub const FALLBACK_CATEGORY: &str = "Other";

/// A registered bot user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    /// Telegram user ID.
    #[serde(rename = "_id")]
    pub user_id: i64,
    /// Username without @, as last seen.
    pub username: Option<String>,
    /// Unix timestamp of registration.
    pub created_at: i64,
}

impl UserRecord {
    pub fn new(user_id: i64, username: Option<String>) -> Self {
        Self {
            user_id,
            username,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
