//! Expense commands: /add, /delete, /move, /expenses, /total.

use chrono::Local;
use teloxide::prelude::*;

use super::{reply, reply_error, sender_id};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{Expense, LedgerError};
use crate::utils::parser::{parse_add, parse_id};
use crate::utils::{format_money, html_escape};

const ADD_USAGE: &str = "Usage: <code>/add [DD.MM.YYYY] &lt;amount&gt; &lt;category&gt; [description]</code>";

/// Handle /add.
pub async fn add_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(parsed) = parse_add(&args) else {
        return reply(&bot, &msg, ADD_USAGE).await;
    };

    let category = match state.categories.find_by_name(user_id, &parsed.category).await {
        Ok(Some(category)) => category,
        Ok(None) => return reply_error(&bot, &msg, LedgerError::UnknownCategory.into()).await,
        Err(e) => return reply_error(&bot, &msg, e).await,
    };

    let date = parsed.date.unwrap_or_else(|| Local::now().date_naive());
    match state
        .expenses
        .add(user_id, date, parsed.amount, category.id, parsed.description.as_deref())
        .await
    {
        Ok(expense) => {
            let text = format!(
                "✅ Recorded {} in <b>{}</b> on {}",
                format_money(expense.amount, &state.currency),
                html_escape(&expense.category_name),
                date.format("%d.%m.%Y")
            );
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /delete.
pub async fn delete_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(id) = parse_id(&args) else {
        return reply(&bot, &msg, "Usage: <code>/delete &lt;expense id&gt;</code>, ids are shown by /expenses").await;
    };

    match state.expenses.delete(user_id, id).await {
        Ok(true) => reply(&bot, &msg, "🗑 Expense deleted").await,
        Ok(false) => reply_error(&bot, &msg, LedgerError::NotFound("Expense").into()).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /move.
pub async fn move_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let mut parts = args.split_whitespace();
    let (Some(id), Some(name)) = (parts.next().and_then(parse_id), parts.next()) else {
        return reply(&bot, &msg, "Usage: <code>/move &lt;expense id&gt; &lt;category&gt;</code>").await;
    };

    let category = match state.categories.find_by_name(user_id, name).await {
        Ok(Some(category)) => category,
        Ok(None) => return reply_error(&bot, &msg, LedgerError::UnknownCategory.into()).await,
        Err(e) => return reply_error(&bot, &msg, e).await,
    };

    match state.expenses.change_category(user_id, id, category.id).await {
        Ok(true) => reply(&bot, &msg, format!("📂 Moved to <b>{}</b>", html_escape(&category.name))).await,
        Ok(false) => reply_error(&bot, &msg, LedgerError::NotFound("Expense").into()).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /expenses.
pub async fn expenses_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.expenses.last(user_id, 5).await {
        Ok(expenses) if expenses.is_empty() => reply(&bot, &msg, "No expenses yet. Try <code>/add 50 Coffee</code>").await,
        Ok(expenses) => {
            let mut text = String::from("<b>Last expenses</b>\n");
            for expense in &expenses {
                text.push('\n');
                text.push_str(&expense_line(expense, &state.currency));
            }
            reply(&bot, &msg, text).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /total.
pub async fn total_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.expenses.total_spent(user_id).await {
        Ok(total) => reply(&bot, &msg, format!("💸 Total spent: <b>{}</b>", format_money(total, &state.currency))).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// One listing line; the id is what /delete and /move take.
pub(crate) fn expense_line(expense: &Expense, currency: &str) -> String {
    let mut line = format!(
        "{:02}.{:02}.{} · {} · {}",
        expense.day,
        expense.month,
        expense.year,
        format_money(expense.amount, currency),
        html_escape(&expense.category_name)
    );
    if let Some(description) = &expense.description {
        line.push_str(&format!(" · {}", html_escape(description)));
    }
    line.push_str(&format!("\n<code>{}</code>", expense.id.to_hex()));
    line
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mongodb::bson::oid::ObjectId;

    use super::*;

    #[test]
    fn test_expense_line_escapes_user_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let expense = Expense::new(1, date, 45.5, ObjectId::new(), "Food & Drinks".into(), Some("<b>".into()));
        let line = expense_line(&expense, "UAH");

        assert!(line.starts_with("07.03.2024 · 45.50 UAH · Food &amp; Drinks · &lt;b&gt;"));
        assert!(line.contains(&expense.id.to_hex()));
    }
}
