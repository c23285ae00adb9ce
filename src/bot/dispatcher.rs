//! Message dispatcher setup.
//!
//! Builds the dispatcher with the ledger command handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::warn;

use crate::cache::{CacheClient, ReportImageCache};
use crate::config::Config;
use crate::database::{CategoryRepository, Database, ExpenseRepository, IncomeRepository, UserRepo};
use crate::plugins;
use crate::reports::ReportService;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// User registration.
    pub users: Arc<UserRepo>,

    /// Expense categories.
    pub categories: Arc<CategoryRepository>,

    pub expenses: Arc<ExpenseRepository>,

    pub incomes: Arc<IncomeRepository>,

    /// Charts and balance.
    pub reports: Arc<ReportService>,

    /// Currency label shown next to amounts.
    pub currency: Arc<str>,
}

impl AppState {
    /// Create the repositories over one database and one cache client.
    pub fn new(db: &Database, cache: &CacheClient, config: &Config) -> Self {
        let expenses = Arc::new(ExpenseRepository::new(db, cache));
        let incomes = Arc::new(IncomeRepository::new(db, cache));
        let images = ReportImageCache::new(cache.clone(), config.report_image_ttl);
        let reports = Arc::new(ReportService::new(
            expenses.clone(),
            incomes.clone(),
            images,
            config.currency.clone(),
        ));

        Self {
            users: Arc::new(UserRepo::new(db, cache)),
            categories: Arc::new(CategoryRepository::new(db, cache)),
            expenses,
            incomes,
            reports,
            currency: Arc::from(config.currency.as_str()),
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    // Registration first, then commands
    let message_handler = Update::filter_message()
        .inspect_async(register_user)
        .branch(plugins::command_handler());

    dptree::entry().branch(message_handler)
}

/// Register the sender on first contact (runs before all handlers).
async fn register_user(msg: Message, state: AppState) {
    if let Some(user) = msg.from.as_ref() {
        let user_id = user.id.0 as i64;
        if let Err(e) = state.users.ensure_registered(user_id, user.username.as_deref()).await {
            warn!(user_id, error = %e, "Failed to register user");
        }
    }
}
