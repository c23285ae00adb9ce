//! Income commands: /income, /deleteincome, /incomes, /totalincome, /balance.

use chrono::Local;
use teloxide::prelude::*;

use super::{reply, reply_error, sender_id};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{Income, LedgerError};
use crate::utils::parser::{parse_id, parse_income};
use crate::utils::{format_money, html_escape};

/// Handle /income.
pub async fn income_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(parsed) = parse_income(&args) else {
        return reply(&bot, &msg, "Usage: <code>/income [DD.MM.YYYY] &lt;amount&gt; [description]</code>").await;
    };

    let date = parsed.date.unwrap_or_else(|| Local::now().date_naive());
    match state.incomes.add(user_id, date, parsed.amount, parsed.description.as_deref()).await {
        Ok(income) => {
            let text = format!(
                "💰 Income of {} recorded on {}",
                format_money(income.amount, &state.currency),
                date.format("%d.%m.%Y")
            );
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /deleteincome.
pub async fn deleteincome_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(id) = parse_id(&args) else {
        return reply(&bot, &msg, "Usage: <code>/deleteincome &lt;income id&gt;</code>, ids are shown by /incomes").await;
    };

    match state.incomes.delete(user_id, id).await {
        Ok(true) => reply(&bot, &msg, "🗑 Income deleted").await,
        Ok(false) => reply_error(&bot, &msg, LedgerError::NotFound("Income").into()).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /incomes.
pub async fn incomes_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.incomes.last(user_id, 5).await {
        Ok(incomes) if incomes.is_empty() => reply(&bot, &msg, "No incomes yet. Try <code>/income 1000 salary</code>").await,
        Ok(incomes) => {
            let mut text = String::from("<b>Last incomes</b>\n");
            for income in &incomes {
                text.push('\n');
                text.push_str(&income_line(income, &state.currency));
            }
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /totalincome.
pub async fn totalincome_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.incomes.total(user_id).await {
        Ok(total) => reply(&bot, &msg, format!("💰 Total income: <b>{}</b>", format_money(total, &state.currency))).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /balance.
pub async fn balance_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.reports.balance(user_id).await {
        Ok(balance) => {
            let text = format!(
                "<b>Balance</b>\n\nIncome: {}\nSpent: {}\nRemaining: <b>{}</b>",
                format_money(balance.income, &state.currency),
                format_money(balance.spent, &state.currency),
                format_money(balance.remaining(), &state.currency)
            );
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

pub(crate) fn income_line(income: &Income, currency: &str) -> String {
    let mut line = format!(
        "{:02}.{:02}.{} · {}",
        income.day,
        income.month,
        income.year,
        format_money(income.amount, currency)
    );
    if let Some(description) = &income.description {
        line.push_str(&format!(" · {}", html_escape(description)));
    }
    line.push_str(&format!("\n<code>{}</code>", income.id.to_hex()));
    line
}
