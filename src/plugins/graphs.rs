//! Chart commands and cache reset: /graphday, /graphmonth, /graphyear, /resetcache.

use chrono::{Datelike, Local};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ReplyParameters};
use tracing::info;

use super::reports::year_or_current;
use super::{reply, reply_error, sender_id};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::utils::month_name;
use crate::utils::parser::parse_month;

/// Handle /graphday.
pub async fn graphday_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let (year, month) = if args.trim().is_empty() {
        let today = Local::now().date_naive();
        (today.year(), today.month())
    } else {
        match parse_month(&args) {
            Some(period) => period,
            None => return reply(&bot, &msg, "Usage: <code>/graphday [MM.YYYY]</code>").await,
        }
    };

    match state.reports.daily_chart(user_id, year, month).await {
        Ok(svg) => {
            let caption = format!("Daily report, {} {year}", month_name(month));
            send_chart(&bot, &msg, svg, format!("daily-{year}-{month:02}.svg"), caption).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /graphmonth.
pub async fn graphmonth_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(year) = year_or_current(&args) else {
        return reply(&bot, &msg, "Usage: <code>/graphmonth [YYYY]</code>").await;
    };

    match state.reports.monthly_chart(user_id, year).await {
        Ok(svg) => send_chart(&bot, &msg, svg, format!("monthly-{year}.svg"), format!("Monthly report, {year}")).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /graphyear.
pub async fn graphyear_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(year) = year_or_current(&args) else {
        return reply(&bot, &msg, "Usage: <code>/graphyear [YYYY]</code>").await;
    };

    match state.reports.yearly_chart(user_id, year).await {
        Ok(svg) => send_chart(&bot, &msg, svg, format!("categories-{year}.svg"), format!("Spending by category, {year}")).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /resetcache.
pub async fn resetcache_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    let deleted = state.users.reset_cache(user_id).await;
    info!(user_id, deleted, "Cache reset on request");
    reply(&bot, &msg, format!("🧹 Cleared {deleted} cached entries")).await
}

async fn send_chart(
    bot: &ThrottledBot,
    msg: &Message,
    svg: Vec<u8>,
    file_name: String,
    caption: String,
) -> anyhow::Result<()> {
    bot.send_document(msg.chat.id, InputFile::memory(svg).file_name(file_name))
        .caption(caption)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}
