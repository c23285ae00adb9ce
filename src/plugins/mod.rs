//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()`

pub mod categories;
pub mod expenses;
pub mod graphs;
pub mod incomes;
pub mod reports;
pub mod start;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyParameters};
use teloxide::utils::command::BotCommands;
use tracing::error;

use crate::bot::dispatcher::ThrottledBot;
use crate::database::LedgerError;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show this help")]
    Help,

    // Expenses
    #[command(description = "Record an expense: [DD.MM.YYYY] <amount> <category> [description]")]
    Add(String),

    #[command(description = "Delete an expense: <expense id>")]
    Delete(String),

    #[command(description = "Move an expense: <expense id> <category>")]
    Move(String),

    #[command(description = "Last expenses")]
    Expenses,

    #[command(description = "Total spent")]
    Total,

    // Incomes
    #[command(description = "Record an income: [DD.MM.YYYY] <amount> [description]")]
    Income(String),

    #[command(description = "Delete an income: <income id>")]
    Deleteincome(String),

    #[command(description = "Last incomes")]
    Incomes,

    #[command(description = "Total income")]
    Totalincome,

    #[command(description = "Income minus expenses")]
    Balance,

    // Reports
    #[command(description = "Records of a day: [DD.MM.YYYY]")]
    Day(String),

    #[command(description = "Spending by category for a month: [MM.YYYY]")]
    Month(String),

    #[command(description = "Spending by month for a year: [YYYY]")]
    Year(String),

    #[command(description = "Years with expenses")]
    Years,

    // Categories
    #[command(description = "List your categories")]
    Categories,

    #[command(description = "Create a category: <name>")]
    Addcategory(String),

    #[command(description = "Rename a category: <old> | <new>")]
    Renamecategory(String),

    #[command(description = "Delete a category: <name> [| <target>]")]
    Delcategory(String),

    #[command(description = "Category statistics: <name>")]
    Catstats(String),

    // Charts
    #[command(description = "Daily chart: [MM.YYYY]")]
    Graphday(String),

    #[command(description = "Monthly chart: [YYYY]")]
    Graphmonth(String),

    #[command(description = "Category chart: [YYYY]")]
    Graphyear(String),

    #[command(description = "Drop your cached reports")]
    Resetcache,
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start::start_command))
        .branch(case![Command::Help].endpoint(start::help_command))
        // Expenses
        .branch(case![Command::Add(args)].endpoint(expenses::add_command))
        .branch(case![Command::Delete(args)].endpoint(expenses::delete_command))
        .branch(case![Command::Move(args)].endpoint(expenses::move_command))
        .branch(case![Command::Expenses].endpoint(expenses::expenses_command))
        .branch(case![Command::Total].endpoint(expenses::total_command))
        // Incomes
        .branch(case![Command::Income(args)].endpoint(incomes::income_command))
        .branch(case![Command::Deleteincome(args)].endpoint(incomes::deleteincome_command))
        .branch(case![Command::Incomes].endpoint(incomes::incomes_command))
        .branch(case![Command::Totalincome].endpoint(incomes::totalincome_command))
        .branch(case![Command::Balance].endpoint(incomes::balance_command))
        // Reports
        .branch(case![Command::Day(args)].endpoint(reports::day_command))
        .branch(case![Command::Month(args)].endpoint(reports::month_command))
        .branch(case![Command::Year(args)].endpoint(reports::year_command))
        .branch(case![Command::Years].endpoint(reports::years_command))
        // Categories
        .branch(case![Command::Categories].endpoint(categories::categories_command))
        .branch(case![Command::Addcategory(args)].endpoint(categories::addcategory_command))
        .branch(case![Command::Renamecategory(args)].endpoint(categories::renamecategory_command))
        .branch(case![Command::Delcategory(args)].endpoint(categories::delcategory_command))
        .branch(case![Command::Catstats(args)].endpoint(categories::catstats_command))
        // Charts
        .branch(case![Command::Graphday(args)].endpoint(graphs::graphday_command))
        .branch(case![Command::Graphmonth(args)].endpoint(graphs::graphmonth_command))
        .branch(case![Command::Graphyear(args)].endpoint(graphs::graphyear_command))
        .branch(case![Command::Resetcache].endpoint(graphs::resetcache_command))
}

/// Telegram id of the sender as stored in the ledger.
pub(crate) fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| user.id.0 as i64)
}

/// Reply to the command message with HTML text.
pub(crate) async fn reply(bot: &ThrottledBot, msg: &Message, text: impl Into<String>) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, text.into())
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Tell the user why a command failed.
///
/// Validation errors are shown verbatim; anything else is logged and
/// answered with a generic message.
pub(crate) async fn reply_error(bot: &ThrottledBot, msg: &Message, err: anyhow::Error) -> anyhow::Result<()> {
    if let Some(ledger) = err.downcast_ref::<LedgerError>() {
        return reply(bot, msg, format!("⚠️ {}", crate::utils::html_escape(&ledger.to_string()))).await;
    }
    error!(chat_id = msg.chat.id.0, error = %err, "Command failed");
    reply(bot, msg, "❌ Something went wrong, please try again later.").await
}
