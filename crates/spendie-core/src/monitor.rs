//! Budget monitor: compares spend against budgets and emits threshold alerts

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::normalize_thresholds;
use crate::db::Database;
use crate::error::Result;
use crate::models::Alert;
use crate::period::Period;

/// Highest threshold in `thresholds` (ascending) that `spent` has reached
/// and that is above `last_alerted`.
pub fn highest_new_threshold(
    spent: Decimal,
    limit: Decimal,
    thresholds: &[Decimal],
    last_alerted: Option<Decimal>,
) -> Option<Decimal> {
    if limit <= Decimal::ZERO {
        return None;
    }
    thresholds
        .iter()
        .rev()
        .copied()
        .find(|t| spent >= *t * limit)
        .filter(|t| last_alerted.map_or(true, |last| *t > last))
}

#[derive(Clone)]
pub struct BudgetMonitor {
    db: Database,
    thresholds: Vec<Decimal>,
}

impl BudgetMonitor {
    pub fn new(db: Database, thresholds: &[Decimal]) -> Self {
        Self {
            db,
            thresholds: normalize_thresholds(thresholds),
        }
    }

    pub fn thresholds(&self) -> &[Decimal] {
        &self.thresholds
    }

    /// Check one (owner, category, period) key.
    ///
    /// No budget means no alert. Otherwise returns the highest threshold
    /// newly crossed since the last alert for the key, recording it so it
    /// is never reported again. Runs under the owner's lock so concurrent
    /// writers cannot both report the same crossing.
    pub fn evaluate(&self, owner: &str, category: &str, period: Period) -> Result<Option<Alert>> {
        self.db.with_owner_lock(owner, || {
            let Some(budget) = self.db.get_budget(owner, category, period)? else {
                return Ok(None);
            };

            let spent = self.db.period_total(owner, &budget.category, period)?;
            let last = self
                .db
                .last_alerted_threshold(owner, &budget.category, period)?;

            debug!(
                owner,
                category = %budget.category,
                %period,
                %spent,
                limit = %budget.limit,
                ?last,
                "Evaluating budget"
            );

            match highest_new_threshold(spent, budget.limit, &self.thresholds, last) {
                Some(threshold) => self.db.record_alert(&budget, threshold, spent),
                None => Ok(None),
            }
        })
    }
}
