//! Configuration module for the spendwise bot.
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::{DEFAULT_IMAGE_TTL, DEFAULT_OP_TIMEOUT};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    // Cache
    /// Remote cache store. When unset an in-process store is used, which is
    /// only correct while a single bot instance runs.
    pub redis_url: Option<String>,
    /// Cache store operations slower than this are treated as unavailable.
    pub cache_timeout: Duration,
    pub report_image_ttl: Duration,

    /// Currency label shown next to amounts.
    pub currency: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if a required variable is missing or a numeric one is malformed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cache_timeout = match env::var("CACHE_TIMEOUT_MS") {
            Ok(ms) => Duration::from_millis(ms.trim().parse().context("CACHE_TIMEOUT_MS must be a number of milliseconds")?),
            Err(_) => DEFAULT_OP_TIMEOUT,
        };

        let report_image_ttl = match env::var("REPORT_IMAGE_TTL_SECS") {
            Ok(secs) => Duration::from_secs(secs.trim().parse().context("REPORT_IMAGE_TTL_SECS must be a number of seconds")?),
            Err(_) => DEFAULT_IMAGE_TTL,
        };

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            mongodb_uri: env::var("MONGODB_URI").context("MONGODB_URI must be set")?,
            mongodb_database: env::var("MONGODB_DATABASE").unwrap_or_else(|_| "spendwise".to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            cache_timeout,
            report_image_ttl,
            currency: env::var("CURRENCY").unwrap_or_else(|_| "UAH".to_string()),
        })
    }
}
