//! Command argument parsing.
//!
//! Pure helpers turning the text after a command into typed values:
//! - Amounts: `12`, `12.50`, `12,50`
//! - Dates: `DD.MM.YYYY`
//! - Months: `MM.YYYY`
//! - Years: `YYYY`
//! - Two-part arguments: `left | right`

use chrono::NaiveDate;
use mongodb::bson::oid::ObjectId;

/// Parsed `/add` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AddArgs {
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
}

/// Parsed `/income` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeArgs {
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub description: Option<String>,
}

/// Parse a positive amount. Accepts a comma as decimal separator.
pub fn parse_amount(input: &str) -> Option<f64> {
    let amount: f64 = input.trim().replace(',', ".").parse().ok()?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

/// Parse `DD.MM.YYYY`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%d.%m.%Y").ok()
}

/// Parse `MM.YYYY` into `(year, month)`.
pub fn parse_month(input: &str) -> Option<(i32, u32)> {
    let (month, year) = input.trim().split_once('.')?;
    let month: u32 = month.parse().ok()?;
    let year = parse_year(year)?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Parse a four-digit year.
pub fn parse_year(input: &str) -> Option<i32> {
    let input = input.trim();
    if input.len() != 4 {
        return None;
    }
    input.parse().ok().filter(|y| *y >= 1970)
}

/// Parse a record id as shown in listings.
pub fn parse_id(input: &str) -> Option<ObjectId> {
    ObjectId::parse_str(input.trim()).ok()
}

/// Split `left | right`. The right part is absent when there is no `|` or
/// nothing follows it.
pub fn split_pipe(input: &str) -> (String, Option<String>) {
    match input.split_once('|') {
        Some((left, right)) => {
            let right = right.trim();
            (left.trim().to_string(), (!right.is_empty()).then(|| right.to_string()))
        }
        None => (input.trim().to_string(), None),
    }
}

/// Parse `[DD.MM.YYYY] <amount> <category> [description]`.
pub fn parse_add(input: &str) -> Option<AddArgs> {
    let mut tokens = input.split_whitespace().peekable();
    let date = tokens.peek().and_then(|t| parse_date(t));
    if date.is_some() {
        tokens.next();
    }
    let amount = parse_amount(tokens.next()?)?;
    let category = tokens.next()?.to_string();
    let description = rest(tokens);

    Some(AddArgs {
        date,
        amount,
        category,
        description,
    })
}

/// Parse `[DD.MM.YYYY] <amount> [description]`.
pub fn parse_income(input: &str) -> Option<IncomeArgs> {
    let mut tokens = input.split_whitespace().peekable();
    let date = tokens.peek().and_then(|t| parse_date(t));
    if date.is_some() {
        tokens.next();
    }
    let amount = parse_amount(tokens.next()?)?;
    let description = rest(tokens);

    Some(IncomeArgs {
        date,
        amount,
        description,
    })
}

fn rest<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<String> {
    let text = tokens.collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
