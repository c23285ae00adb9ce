//! Utility functions.
//!
//! Collection of helper functions used across the bot.

pub mod parser;

pub use parser::html_escape;

/// Format an amount with two decimals and the currency label.
pub fn format_money(amount: f64, currency: &str) -> String {
    format!("{amount:.2} {currency}")
}

/// Month name for display.
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
        "November", "December",
    ];
    NAMES.get(month.wrapping_sub(1) as usize).copied().unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(12.5, "UAH"), "12.50 UAH");
        assert_eq!(format_money(-3.0, "UAH"), "-3.00 UAH");
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "?");
    }
}
