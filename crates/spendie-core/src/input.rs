//! Field parsing shared by the CLI, the command API and the chat bot
//!
//! Every failure is a validation error naming the field it came from.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::period::Period;

/// Longest category name accepted
pub const MAX_CATEGORY_LEN: usize = 64;

/// Largest amount or budget limit accepted, in whole currency units
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

const CURRENCY_PREFIXES: [&str; 5] = ["₹", "rs.", "rs", "inr", "$"];

/// Parse a user-entered amount such as `50`, `₹1,200.50` or `Rs 99`.
///
/// The result is strictly positive.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    let mut rest = trimmed;
    let lower = trimmed.to_lowercase();
    for prefix in CURRENCY_PREFIXES {
        if lower.starts_with(prefix) {
            rest = trimmed[prefix.len()..].trim_start();
            break;
        }
    }
    let cleaned: String = rest.chars().filter(|c| *c != ',' && *c != '_').collect();

    if cleaned.is_empty() {
        return Err(Error::validation("amount", "missing"));
    }

    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| Error::validation("amount", format!("not a number: '{}'", trimmed)))?;
    check_amount("amount", amount)
}

/// Amounts and limits must be strictly positive and at most [`MAX_AMOUNT`]
pub fn check_amount(field: &str, amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(
            field,
            format!("must be greater than zero, got {}", amount),
        ));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(Error::validation(
            field,
            format!("must be at most {}, got {}", MAX_AMOUNT, amount),
        ));
    }
    Ok(amount)
}

/// Parse `YYYY-MM-DD`, `today` or `yesterday`
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| {
                Error::validation(
                    "date",
                    format!("expected YYYY-MM-DD, today or yesterday, got '{}'", trimmed),
                )
            })
            .and_then(check_date),
    }
}

/// Stored dates are compared as text, which only orders four-digit years
pub fn check_date(date: NaiveDate) -> Result<NaiveDate> {
    if !(1..=9999).contains(&date.year()) {
        return Err(Error::validation(
            "date",
            format!("year must be between 1 and 9999, got {}", date.year()),
        ));
    }
    Ok(date)
}

/// Parse a budget period (`YYYY-MM`)
pub fn parse_period(input: &str) -> Result<Period> {
    input
        .parse::<Period>()
        .map_err(|message| Error::validation("period", message))
}

/// Parse an expense id
pub fn parse_id(input: &str) -> Result<i64> {
    let trimmed = input.trim().trim_start_matches('#');
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| Error::validation("id", format!("not an expense id: '{}'", input.trim())))
}

/// Trim and check a category name
pub fn normalize_category(input: &str) -> Result<String> {
    let name = input.trim();
    if name.is_empty() {
        return Err(Error::validation("category", "missing"));
    }
    if name.chars().count() > MAX_CATEGORY_LEN {
        return Err(Error::validation(
            "category",
            format!("longer than {} characters", MAX_CATEGORY_LEN),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::validation("category", "contains control characters"));
    }
    Ok(name.to_string())
}

/// Blank descriptions are stored as absent
pub fn normalize_description(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
