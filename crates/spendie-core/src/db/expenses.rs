//! Expense operations

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::categories::ensure_category;
use super::{category_key, date_column, decimal_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseChanges, ExpenseFilter, NewExpense};
use crate::period::DateRange;

const EXPENSE_SELECT: &str = r#"
    SELECT e.id, e.owner, e.amount, c.name, e.date, e.description, e.source, e.created_at
    FROM expenses e
    JOIN categories c ON c.id = e.category_id
"#;

fn row_to_expense(row: &rusqlite::Row<'_>) -> rusqlite::Result<Expense> {
    let source: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Expense {
        id: row.get(0)?,
        owner: row.get(1)?,
        amount: decimal_column(row, 2)?,
        category: row.get(3)?,
        date: date_column(row, 4)?,
        description: row.get(5)?,
        source: source.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: parse_datetime(&created_at),
    })
}

fn fetch_expense(conn: &Connection, owner: &str, id: i64) -> Result<Expense> {
    conn.query_row(
        &format!("{} WHERE e.owner = ? AND e.id = ?", EXPENSE_SELECT),
        params![owner, id],
        row_to_expense,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("expense", id))
}

fn insert_expense(conn: &Connection, owner: &str, expense: &NewExpense) -> Result<i64> {
    let category = expense
        .category
        .as_deref()
        .ok_or_else(|| Error::validation("category", "missing"))?;
    let category_id = ensure_category(conn, owner, category)?;

    conn.execute(
        r#"
        INSERT INTO expenses (owner, category_id, amount, date, description, source)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        params![
            owner,
            category_id,
            expense.amount.to_string(),
            expense.date.to_string(),
            expense.description,
            expense.source.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Escape LIKE wildcards in user input
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl Database {
    /// Insert an expense. The category must already be resolved; it is
    /// created on first use.
    pub fn add_expense(&self, owner: &str, expense: &NewExpense) -> Result<Expense> {
        let created = self.write(owner, |conn| {
            let id = insert_expense(conn, owner, expense)?;
            fetch_expense(conn, owner, id)
        })?;

        info!(
            owner,
            id = created.id,
            category = %created.category,
            amount = %created.amount,
            "Expense added"
        );
        Ok(created)
    }

    /// Insert a batch of expenses atomically: all or none
    pub fn import_expenses(&self, owner: &str, expenses: &[NewExpense]) -> Result<Vec<Expense>> {
        let created = self.write(owner, |conn| {
            let mut created = Vec::with_capacity(expenses.len());
            for expense in expenses {
                let id = insert_expense(conn, owner, expense)?;
                created.push(fetch_expense(conn, owner, id)?);
            }
            Ok(created)
        })?;

        info!(owner, count = created.len(), "Expenses imported");
        Ok(created)
    }

    /// Get one of the owner's expenses
    pub fn get_expense(&self, owner: &str, id: i64) -> Result<Expense> {
        let conn = self.conn()?;
        fetch_expense(&conn, owner, id)
    }

    /// Apply changes to an expense, returning (before, after)
    pub fn update_expense(
        &self,
        owner: &str,
        id: i64,
        changes: &ExpenseChanges,
    ) -> Result<(Expense, Expense)> {
        let (before, after) = self.write(owner, |conn| {
            let before = fetch_expense(conn, owner, id)?;

            let category_id = match changes.category.as_deref() {
                Some(name) => Some(ensure_category(conn, owner, name)?),
                None => None,
            };
            let description = changes
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .map(|d| if d.is_empty() { None } else { Some(d) });

            conn.execute(
                r#"
                UPDATE expenses SET
                    amount = COALESCE(?, amount),
                    category_id = COALESCE(?, category_id),
                    date = COALESCE(?, date),
                    description = CASE WHEN ? THEN ? ELSE description END,
                    updated_at = CURRENT_TIMESTAMP
                WHERE owner = ? AND id = ?
                "#,
                params![
                    changes.amount.map(|a| a.to_string()),
                    category_id,
                    changes.date.map(|d| d.to_string()),
                    description.is_some(),
                    description.flatten(),
                    owner,
                    id,
                ],
            )?;

            let after = fetch_expense(conn, owner, id)?;
            Ok((before, after))
        })?;

        info!(owner, id, "Expense updated");
        Ok((before, after))
    }

    /// Delete one expense, returning what was removed
    pub fn delete_expense(&self, owner: &str, id: i64) -> Result<Expense> {
        let removed = self.write(owner, |conn| {
            let expense = fetch_expense(conn, owner, id)?;
            conn.execute(
                "DELETE FROM expenses WHERE owner = ? AND id = ?",
                params![owner, id],
            )?;
            Ok(expense)
        })?;

        info!(owner, id, "Expense deleted");
        Ok(removed)
    }

    /// Delete every expense the owner has. Categories and budgets stay.
    pub fn delete_all_expenses(&self, owner: &str) -> Result<usize> {
        let count = self.write(owner, |conn| {
            Ok(conn.execute("DELETE FROM expenses WHERE owner = ?", params![owner])?)
        })?;

        info!(owner, count, "All expenses deleted");
        Ok(count)
    }

    /// List expenses newest first.
    ///
    /// Amount bounds are applied on the exact decimal values after the
    /// query, then the limit.
    pub fn list_expenses(&self, owner: &str, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut conditions = vec!["e.owner = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner.to_string())];

        if let Some(category) = &filter.category {
            conditions.push("c.name_key = ?".to_string());
            params.push(Box::new(category_key(category)));
        }
        if let Some(range) = &filter.range {
            conditions.push("e.date >= ? AND e.date <= ?".to_string());
            params.push(Box::new(range.from.to_string()));
            params.push(Box::new(range.to.to_string()));
        }
        if let Some(keyword) = filter.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            conditions.push("e.description LIKE ? ESCAPE '\\'".to_string());
            params.push(Box::new(like_pattern(keyword.trim())));
        }

        let sql = format!(
            "{} WHERE {} ORDER BY e.date DESC, e.id DESC",
            EXPENSE_SELECT,
            conditions.join(" AND ")
        );
        debug!(owner, sql = %sql, "Listing expenses");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let expenses = rows
            .into_iter()
            .filter(|e| filter.min_amount.map_or(true, |min| e.amount >= min))
            .filter(|e| filter.max_amount.map_or(true, |max| e.amount <= max))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(expenses)
    }

    /// All expenses in a range, oldest first (date, then id).
    ///
    /// This is what aggregation, export and budget evaluation read.
    pub fn expenses_in_range(
        &self,
        owner: &str,
        category: Option<&str>,
        range: &DateRange,
    ) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let rows = match category {
            Some(category) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE e.owner = ? AND c.name_key = ? AND e.date >= ? AND e.date <= ? ORDER BY e.date, e.id",
                    EXPENSE_SELECT
                ))?;
                let rows = stmt
                    .query_map(
                        params![owner, category_key(category), range.from.to_string(), range.to.to_string()],
                        row_to_expense,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE e.owner = ? AND e.date >= ? AND e.date <= ? ORDER BY e.date, e.id",
                    EXPENSE_SELECT
                ))?;
                let rows = stmt
                    .query_map(
                        params![owner, range.from.to_string(), range.to.to_string()],
                        row_to_expense,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    /// Count of the owner's expenses (all time)
    pub fn count_expenses(&self, owner: &str) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE owner = ?",
            params![owner],
            |row| row.get(0),
        )?)
    }
}
