//! Spendwise - personal finance Telegram bot
//!
//! Tracks expenses and incomes per Telegram user and answers report
//! commands from a read-through cache.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB models and cached repositories
//! - `cache` - Key builder, memoizer, stores and invalidation
//! - `charts` - SVG report rendering
//! - `reports` - Chart and balance service over the repositories
//! - `bot` - Dispatcher and runtime (with Throttle for API rate limiting)
//! - `plugins` - Command handlers
//! - `utils` - Argument parsing and formatting

mod bot;
mod cache;
mod charts;
mod config;
mod database;
mod plugins;
mod reports;
mod utils;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cache::{CacheClient, MemoryStore, RedisStore};
use config::Config;
use database::Database;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spendwise=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Spendwise bot...");

    let config = Config::from_env()?;
    info!(currency = %config.currency, "Configuration loaded");

    // Connect to MongoDB
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;

    // Cache store: Redis when configured, in-process otherwise
    let cache = match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url).await?;
            info!("Cache store: redis");
            CacheClient::with_timeout(store, config.cache_timeout)
        }
        None => {
            warn!("REDIS_URL not set, using in-process cache store");
            CacheClient::with_timeout(MemoryStore::default(), config.cache_timeout)
        }
    };

    let state = bot::AppState::new(&db, &cache, &config);

    // Throttle respects Telegram's rate limits:
    // - 30 messages per second globally
    // - 1 message per second to the same chat
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    let dispatcher = bot::build_dispatcher(bot, state);
    bot::run(dispatcher).await;

    if let Err(e) = cache.close().await {
        warn!(error = %e, "Cache store did not close cleanly");
    }
    info!("Shutdown complete");

    Ok(())
}
