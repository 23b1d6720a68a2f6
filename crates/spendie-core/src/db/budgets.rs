//! Budget operations

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use super::categories::ensure_category;
use super::{category_key, decimal_column, period_column, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetWrite};
use crate::period::Period;

const BUDGET_SELECT: &str = r#"
    SELECT b.id, b.owner, c.name, b.period, b.limit_amount
    FROM budgets b
    JOIN categories c ON c.id = b.category_id
"#;

fn row_to_budget(row: &rusqlite::Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        owner: row.get(1)?,
        category: row.get(2)?,
        period: period_column(row, 3)?,
        limit: decimal_column(row, 4)?,
    })
}

fn fetch_budget(conn: &Connection, id: i64) -> Result<Budget> {
    conn.query_row(
        &format!("{} WHERE b.id = ?", BUDGET_SELECT),
        params![id],
        row_to_budget,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("budget", id))
}

impl Database {
    /// Store a budget for (owner, category, period).
    ///
    /// A second budget for the same key is a conflict unless `replace` is
    /// set. Replacing with a different limit resets the key's alert state.
    pub fn set_budget(
        &self,
        owner: &str,
        category: &str,
        period: Period,
        limit: Decimal,
        replace: bool,
    ) -> Result<BudgetWrite> {
        let written = self.write(owner, |conn| {
            let category_id = ensure_category(conn, owner, category)?;

            let existing: Option<(i64, String)> = conn
                .query_row(
                    "SELECT id, limit_amount FROM budgets WHERE owner = ? AND category_id = ? AND period = ?",
                    params![owner, category_id, period.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match existing {
                Some(_) if !replace => {
                    let budget_name: String = conn.query_row(
                        "SELECT name FROM categories WHERE id = ?",
                        params![category_id],
                        |row| row.get(0),
                    )?;
                    Err(Error::Conflict(format!(
                        "a budget for {} in {} already exists; update it to change the limit",
                        budget_name, period
                    )))
                }
                Some((id, old_limit)) => {
                    let old_limit = Decimal::from_str(&old_limit)
                        .map_err(|e| Error::InvalidData(format!("budget {} limit: {}", id, e)))?;
                    conn.execute(
                        "UPDATE budgets SET limit_amount = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                        params![limit.to_string(), id],
                    )?;

                    let reset = old_limit != limit;
                    if reset {
                        conn.execute(
                            "DELETE FROM budget_alerts WHERE owner = ? AND category_id = ? AND period = ?",
                            params![owner, category_id, period.to_string()],
                        )?;
                    }
                    Ok(BudgetWrite {
                        budget: fetch_budget(conn, id)?,
                        replaced: true,
                        reset,
                    })
                }
                None => {
                    conn.execute(
                        "INSERT INTO budgets (owner, category_id, period, limit_amount) VALUES (?, ?, ?, ?)",
                        params![owner, category_id, period.to_string(), limit.to_string()],
                    )?;
                    Ok(BudgetWrite {
                        budget: fetch_budget(conn, conn.last_insert_rowid())?,
                        replaced: false,
                        reset: false,
                    })
                }
            }
        })?;

        info!(
            owner,
            category = %written.budget.category,
            period = %written.budget.period,
            limit = %written.budget.limit,
            replaced = written.replaced,
            "Budget set"
        );
        Ok(written)
    }

    /// The active budget for a key, if any
    pub fn get_budget(&self, owner: &str, category: &str, period: Period) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "{} WHERE b.owner = ? AND c.name_key = ? AND b.period = ?",
                    BUDGET_SELECT
                ),
                params![owner, category_key(category), period.to_string()],
                row_to_budget,
            )
            .optional()?)
    }

    /// List budgets, optionally for one month, ordered by month then category
    pub fn list_budgets(&self, owner: &str, period: Option<Period>) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let budgets = match period {
            Some(period) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE b.owner = ? AND b.period = ? ORDER BY b.period, c.name",
                    BUDGET_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![owner, period.to_string()], row_to_budget)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE b.owner = ? ORDER BY b.period, c.name",
                    BUDGET_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![owner], row_to_budget)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(budgets)
    }

    /// Delete a budget and its alert state
    pub fn delete_budget(&self, owner: &str, category: &str, period: Period) -> Result<Budget> {
        let removed = self.write(owner, |conn| {
            let budget = conn
                .query_row(
                    &format!(
                        "{} WHERE b.owner = ? AND c.name_key = ? AND b.period = ?",
                        BUDGET_SELECT
                    ),
                    params![owner, category_key(category), period.to_string()],
                    row_to_budget,
                )
                .optional()?
                .ok_or_else(|| Error::not_found("budget", format!("{} {}", category, period)))?;

            conn.execute(
                r#"
                DELETE FROM budget_alerts
                WHERE owner = ? AND period = ?
                  AND category_id = (SELECT category_id FROM budgets WHERE id = ?)
                "#,
                params![owner, period.to_string(), budget.id],
            )?;
            conn.execute("DELETE FROM budgets WHERE id = ?", params![budget.id])?;
            Ok(budget)
        })?;

        info!(owner, category = %removed.category, period = %period, "Budget deleted");
        Ok(removed)
    }
}
