//! Alert state: which thresholds have already been reported per key

use std::str::FromStr;

use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use super::{category_key, decimal_column, parse_datetime, period_column, Database};
use crate::error::{Error, Result};
use crate::models::{Alert, Budget};
use crate::period::Period;

const ALERT_SELECT: &str = r#"
    SELECT a.id, a.owner, c.name, a.period, a.threshold, a.spent, a.limit_amount, a.created_at
    FROM budget_alerts a
    JOIN categories c ON c.id = a.category_id
"#;

fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    let created_at: String = row.get(7)?;
    Ok(Alert {
        id: row.get(0)?,
        owner: row.get(1)?,
        category: row.get(2)?,
        period: period_column(row, 3)?,
        threshold: decimal_column(row, 4)?,
        spent: decimal_column(row, 5)?,
        limit: decimal_column(row, 6)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Highest threshold already alerted for a key since its last reset
    pub fn last_alerted_threshold(
        &self,
        owner: &str,
        category: &str,
        period: Period,
    ) -> Result<Option<Decimal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT a.threshold
            FROM budget_alerts a
            JOIN categories c ON c.id = a.category_id
            WHERE a.owner = ? AND c.name_key = ? AND a.period = ?
            "#,
        )?;
        let thresholds = stmt
            .query_map(params![owner, category_key(category), period.to_string()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Compared as decimals; text ordering would put "10" before "9"
        let mut highest: Option<Decimal> = None;
        for text in thresholds {
            let value = Decimal::from_str(&text)
                .map_err(|e| Error::InvalidData(format!("alert threshold '{}': {}", text, e)))?;
            highest = Some(highest.map_or(value, |h| h.max(value)));
        }
        Ok(highest)
    }

    /// Record a crossing of `threshold` for the budget's key.
    ///
    /// Returns None if that threshold was already recorded. Does not take
    /// the owner lock; the budget monitor calls this while holding it.
    pub fn record_alert(
        &self,
        budget: &Budget,
        threshold: Decimal,
        spent: Decimal,
    ) -> Result<Option<Alert>> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO budget_alerts (owner, category_id, period, threshold, spent, limit_amount)
            SELECT owner, category_id, period, ?, ?, limit_amount FROM budgets WHERE id = ?
            "#,
            params![
                threshold.normalize().to_string(),
                spent.to_string(),
                budget.id
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }

        let alert = conn
            .query_row(
                &format!("{} WHERE a.id = ?", ALERT_SELECT),
                params![conn.last_insert_rowid()],
                row_to_alert,
            )
            .optional()?;

        if let Some(alert) = &alert {
            info!(
                owner = %alert.owner,
                category = %alert.category,
                period = %alert.period,
                threshold = %alert.threshold,
                spent = %alert.spent,
                "Budget threshold crossed"
            );
        }
        Ok(alert)
    }

    /// Alerts newest first, optionally for one month
    pub fn list_alerts(&self, owner: &str, period: Option<Period>) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let alerts = match period {
            Some(period) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE a.owner = ? AND a.period = ? ORDER BY a.created_at DESC, a.id DESC",
                    ALERT_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![owner, period.to_string()], row_to_alert)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE a.owner = ? ORDER BY a.created_at DESC, a.id DESC",
                    ALERT_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![owner], row_to_alert)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(alerts)
    }
}
