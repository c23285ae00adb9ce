//! Category commands: /categories, /addcategory, /renamecategory, /delcategory, /catstats.

use teloxide::prelude::*;

use super::{reply, reply_error, sender_id};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{Category, LedgerError};
use crate::utils::parser::split_pipe;
use crate::utils::{format_money, html_escape};

/// Handle /categories.
pub async fn categories_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.categories.list(user_id).await {
        Ok(categories) if categories.is_empty() => {
            reply(&bot, &msg, "No categories. Create one with <code>/addcategory &lt;name&gt;</code>").await
        }
        Ok(categories) => {
            let mut text = String::from("<b>Your categories</b>\n");
            for category in &categories {
                text.push_str(&format!("\n• {}", html_escape(&category.name)));
            }
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /addcategory.
pub async fn addcategory_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.categories.add(user_id, &args).await {
        Ok(category) => reply(&bot, &msg, format!("✅ Category <b>{}</b> created", html_escape(&category.name))).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /renamecategory.
pub async fn renamecategory_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let (old, Some(new)) = split_pipe(&args) else {
        return reply(&bot, &msg, "Usage: <code>/renamecategory &lt;old&gt; | &lt;new&gt;</code>").await;
    };

    let category = match named(&state, user_id, &old).await {
        Ok(category) => category,
        Err(e) => return reply_error(&bot, &msg, e).await,
    };
    match state.categories.rename(user_id, category.id, &new).await {
        Ok(renamed) => {
            let text = format!(
                "✏️ <b>{}</b> is now <b>{}</b>",
                html_escape(&category.name),
                html_escape(&renamed.name)
            );
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /delcategory.
pub async fn delcategory_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let (name, target_name) = split_pipe(&args);
    if name.is_empty() {
        return reply(&bot, &msg, "Usage: <code>/delcategory &lt;name&gt; [| &lt;target&gt;]</code>").await;
    }

    let resolved = async {
        let category = named(&state, user_id, &name).await?;
        let target = match target_name {
            Some(target_name) => Some(named(&state, user_id, &target_name).await?.id),
            None => None,
        };
        let receiver = state.categories.delete(user_id, category.id, target).await?;
        anyhow::Ok((category, receiver))
    }
    .await;

    match resolved {
        Ok((deleted, receiver)) => {
            let text = format!(
                "🗑 <b>{}</b> deleted, its expenses moved to <b>{}</b>",
                html_escape(&deleted.name),
                html_escape(&receiver.name)
            );
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /catstats.
pub async fn catstats_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    if args.trim().is_empty() {
        return reply(&bot, &msg, "Usage: <code>/catstats &lt;name&gt;</code>").await;
    }

    let stats = async {
        let category = named(&state, user_id, &args).await?;
        state.categories.statistics(user_id, category.id).await
    }
    .await;

    match stats {
        Ok(stats) => {
            let text = format!(
                "📊 <b>{}</b>\n\nSpent: {}\nExpenses: {}\nAverage: {}",
                html_escape(&stats.name),
                format_money(stats.total_spent, &state.currency),
                stats.expense_count,
                format_money(stats.average_amount, &state.currency)
            );
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

async fn named(state: &AppState, user_id: i64, name: &str) -> anyhow::Result<Category> {
    state
        .categories
        .find_by_name(user_id, name)
        .await?
        .ok_or_else(|| LedgerError::UnknownCategory.into())
}
