//! CSV export and import of expenses
//!
//! Columns are fixed: `date,category,amount,description`. Quoting follows
//! standard CSV rules, so exporting then importing yields the same expenses.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::input::{check_date, normalize_category, normalize_description, parse_amount};
use crate::models::{Expense, ExpenseSource, NewExpense};

/// Header row of every export
pub const CSV_HEADER: [&str; 4] = ["date", "category", "amount", "description"];

/// Render expenses as CSV, ordered by date then id
pub fn write_csv(expenses: &[Expense]) -> Result<String> {
    let mut sorted: Vec<&Expense> = expenses.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for expense in sorted {
        writer.write_record([
            expense.date.to_string(),
            expense.category.clone(),
            expense.amount.to_string(),
            expense.description.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(e.to_string()))
}

/// Attach the CSV line number to a validation error
fn at_line(line: u64, err: Error) -> Error {
    match err {
        Error::Validation { field, message } => Error::Validation {
            field,
            message: format!("line {}: {}", line, message),
        },
        other => other,
    }
}

fn parse_record(record: &StringRecord, line: u64) -> Result<NewExpense> {
    let field = |i: usize| record.get(i).unwrap_or("").trim();

    let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d").map_err(|_| {
        Error::validation(
            "date",
            format!("line {}: expected YYYY-MM-DD, got '{}'", line, field(0)),
        )
    })?;
    let date = check_date(date).map_err(|e| at_line(line, e))?;
    let category = normalize_category(field(1)).map_err(|e| at_line(line, e))?;
    let amount = parse_amount(field(2)).map_err(|e| at_line(line, e))?;

    Ok(NewExpense {
        amount,
        category: Some(category),
        date,
        description: normalize_description(record.get(3)),
        source: ExpenseSource::Import,
    })
}

/// Parse an exported CSV back into expenses.
///
/// The header must match the export header (case-insensitive). Any bad row
/// fails the whole parse with an error naming the line and field.
pub fn parse_csv(text: &str) -> Result<Vec<NewExpense>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::validation("csv", e.to_string()))?
        .clone();
    let found: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    if found != CSV_HEADER {
        return Err(Error::validation(
            "header",
            format!(
                "expected '{}', got '{}'",
                CSV_HEADER.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        ));
    }

    let mut expenses = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::validation("csv", e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        expenses.push(parse_record(&record, line)?);
    }

    debug!(count = expenses.len(), "Parsed expense CSV");
    Ok(expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn expense(id: i64, date: &str, category: &str, amount: Decimal, desc: Option<&str>) -> Expense {
        Expense {
            id,
            owner: "u1".into(),
            amount,
            category: category.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: desc.map(str::to_string),
            source: ExpenseSource::Manual,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_write_csv_quotes_and_orders() {
        let expenses = vec![
            expense(2, "2024-01-10", "Food", dec!(30), Some("pizza, \"large\"")),
            expense(1, "2024-01-05", "Food", dec!(50.25), None),
        ];
        let csv = write_csv(&expenses).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,category,amount,description");
        assert_eq!(lines[1], "2024-01-05,Food,50.25,");
        assert_eq!(lines[2], "2024-01-10,Food,30,\"pizza, \"\"large\"\"\"");
    }

    #[test]
    fn test_csv_survives_newlines_in_description() {
        let expenses = vec![expense(1, "2024-02-01", "Gifts", dec!(12), Some("card\nand flowers"))];
        let parsed = parse_csv(&write_csv(&expenses).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].description.as_deref(), Some("card\nand flowers"));
        assert_eq!(parsed[0].source, ExpenseSource::Import);
    }

    #[test]
    fn test_parse_csv_header_only() {
        assert!(parse_csv("date,category,amount,description\n").unwrap().is_empty());
        assert!(parse_csv("Date,Category,Amount,Description\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_csv_wrong_header() {
        let err = parse_csv("when,what,how much\n2024-01-01,food,5\n").unwrap_err();
        assert!(err.to_string().starts_with("invalid header"));
    }

    #[test]
    fn test_parse_csv_names_line_and_field() {
        let text = "date,category,amount,description\n2024-01-01,food,5,\n2024-01-02,food,lots,\n";
        let err = parse_csv(text).unwrap_err();
        assert_eq!(err.to_string(), "invalid amount: line 3: not a number: 'lots'");

        let text = "date,category,amount,description\n01/02/2024,food,5,\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().starts_with("invalid date: line 2"));
    }

    #[test]
    fn test_parse_csv_ragged_row_is_validation_error() {
        let text = "date,category,amount,description\n2024-01-01,food\n";
        let err = parse_csv(text).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }
}
