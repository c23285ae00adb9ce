//! Text reports: /day, /month, /year, /years.

use std::collections::BTreeMap;

use chrono::{Datelike, Local};
use teloxide::prelude::*;

use super::expenses::expense_line;
use super::incomes::income_line;
use super::{reply, reply_error, sender_id};
use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::database::{CategoryTotal, MonthlyCategoryTotal};
use crate::utils::parser::{parse_date, parse_month, parse_year};
use crate::utils::{format_money, html_escape, month_name};

/// Handle /day.
pub async fn day_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let date = if args.trim().is_empty() {
        Local::now().date_naive()
    } else {
        match parse_date(&args) {
            Some(date) => date,
            None => return reply(&bot, &msg, "Usage: <code>/day [DD.MM.YYYY]</code>").await,
        }
    };

    let records = tokio::try_join!(state.expenses.by_date(user_id, date), state.incomes.by_date(user_id, date));
    let (expenses, incomes) = match records {
        Ok(records) => records,
        Err(e) => return reply_error(&bot, &msg, e).await,
    };

    let mut text = format!("<b>{}</b>\n", date.format("%d.%m.%Y"));
    if expenses.is_empty() && incomes.is_empty() {
        text.push_str("\nNothing recorded.");
    }
    if !expenses.is_empty() {
        text.push_str("\n<b>Expenses</b>\n");
        for expense in &expenses {
            text.push_str(&expense_line(expense, &state.currency));
            text.push('\n');
        }
        let spent: f64 = expenses.iter().map(|e| e.amount).sum();
        text.push_str(&format!("Spent: <b>{}</b>\n", format_money(spent, &state.currency)));
    }
    if !incomes.is_empty() {
        text.push_str("\n<b>Incomes</b>\n");
        for income in &incomes {
            text.push_str(&income_line(income, &state.currency));
            text.push('\n');
        }
    }
    reply(&bot, &msg, text).await
}

/// Handle /month.
pub async fn month_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let (year, month) = if args.trim().is_empty() {
        let today = Local::now().date_naive();
        (today.year(), today.month())
    } else {
        match parse_month(&args) {
            Some(period) => period,
            None => return reply(&bot, &msg, "Usage: <code>/month [MM.YYYY]</code>").await,
        }
    };

    match state.expenses.monthly(user_id, year, month).await {
        Ok(totals) => {
            let title = format!("{} {year}", month_name(month));
            reply(&bot, &msg, category_breakdown(&title, &totals, &state.currency)).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /year.
pub async fn year_command(bot: ThrottledBot, msg: Message, state: AppState, args: String) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };
    let Some(year) = year_or_current(&args) else {
        return reply(&bot, &msg, "Usage: <code>/year [YYYY]</code>").await;
    };

    match state.expenses.yearly(user_id, year).await {
        Ok(rows) => reply(&bot, &msg, month_breakdown(year, &rows, &state.currency)).await,
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Handle /years.
pub async fn years_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    match state.expenses.unique_years(user_id).await {
        Ok(years) if years.is_empty() => reply(&bot, &msg, "No expenses recorded yet.").await,
        Ok(years) => {
            let list = years.iter().map(i32::to_string).collect::<Vec<_>>().join(", ");
            reply(&bot, &msg, format!("📅 Years with expenses: {list}")).await
        }
        Err(e) => reply_error(&bot, &msg, e).await,
    }
}

/// Empty arguments mean the current year.
pub(crate) fn year_or_current(args: &str) -> Option<i32> {
    if args.trim().is_empty() {
        Some(Local::now().year())
    } else {
        parse_year(args)
    }
}

fn category_breakdown(title: &str, totals: &[CategoryTotal], currency: &str) -> String {
    let mut text = format!("<b>{}</b>\n", html_escape(title));
    if totals.is_empty() {
        text.push_str("\nNo expenses.");
        return text;
    }
    for row in totals {
        text.push_str(&format!("\n{}: {}", html_escape(&row.category), format_money(row.total, currency)));
    }
    let sum: f64 = totals.iter().map(|row| row.total).sum();
    text.push_str(&format!("\n\nTotal: <b>{}</b>", format_money(sum, currency)));
    text
}

fn month_breakdown(year: i32, rows: &[MonthlyCategoryTotal], currency: &str) -> String {
    let mut months: BTreeMap<i32, f64> = BTreeMap::new();
    for row in rows {
        *months.entry(row.month).or_default() += row.total;
    }

    let mut text = format!("<b>{year}</b>\n");
    if months.is_empty() {
        text.push_str("\nNo expenses.");
        return text;
    }
    for (month, total) in &months {
        text.push_str(&format!("\n{}: {}", month_name(*month as u32), format_money(*total, currency)));
    }
    let sum: f64 = months.values().sum();
    text.push_str(&format!("\n\nTotal: <b>{}</b>", format_money(sum, currency)));
    text
}
