//! Utility functions for formatting and calendar arithmetic
//!
//! This module provides centralized formatting utilities for consistent
//! display of monetary values, plus the month-stepping date helper used
//! by the cost-basis fallback and the daily series.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "$" prefix
    Usd,
    /// No currency symbol (for table cells)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value with `,` thousands separators and a `.` decimal
/// point, rounded to 2 decimal places.
///
/// # Examples
/// ```
/// use folio::utils::{format_amount_with_symbol, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_amount_with_symbol(dec!(1234.56), CurrencySymbol::Usd),
///     "$1,234.56"
/// );
/// assert_eq!(
///     format_amount_with_symbol(dec!(-500), CurrencySymbol::None),
///     "-500.00"
/// );
/// ```
pub fn format_amount_with_symbol(value: Decimal, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let abs_value = value.abs();

    let formatted = format!("{:.2}", abs_value);
    let parts: Vec<&str> = formatted.split('.').collect();

    let integer_part = parts[0];
    let decimal_part = parts.get(1).unwrap_or(&"00");

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Usd => "$",
        CurrencySymbol::None => "",
    };

    format!("{}{}{}.{}", prefix, sign, with_separators, decimal_part)
}

/// Format with "$" prefix: "$1,234.56"
pub fn format_currency(value: Decimal) -> String {
    format_amount_with_symbol(value, CurrencySymbol::Usd)
}

/// Format number only (no symbol): "1,234.56"
pub fn format_amount(value: Decimal) -> String {
    format_amount_with_symbol(value, CurrencySymbol::None)
}

/// Return the calendar date one month before `t`.
///
/// Same day-of-month in the previous month, clamped to that month's last
/// day: 2023-03-31 -> 2023-02-28, 2024-03-31 -> 2024-02-29,
/// 2023-07-31 -> 2023-06-30.
pub fn subtract_one_month(t: NaiveDate) -> NaiveDate {
    let (year, month) = if t.month() == 1 {
        (t.year() - 1, 12)
    } else {
        (t.year(), t.month() - 1)
    };

    let day = t.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is a valid date")
}

/// Number of days in a calendar month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is a valid date")
        .pred_opt()
        .expect("first of month has a predecessor")
        .day()
}
