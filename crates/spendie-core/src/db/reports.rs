//! Spending reports built from fetched expense records

use rust_decimal::Decimal;
use tracing::debug;

use super::Database;
use crate::aggregate;
use crate::error::{Error, Result};
use crate::models::{
    BudgetStatus, DailyReport, PeriodComparison, PeriodTotal, SpendingSummary, TrendsReport,
};
use crate::period::{DateRange, Period};

/// Longest range a daily report will zero-fill
pub const MAX_DAILY_DAYS: i64 = 366;

impl Database {
    /// Per-category, per-month totals for a range, ordered chronologically.
    ///
    /// An empty range (no expenses) gives an empty list.
    pub fn aggregate_spending(
        &self,
        owner: &str,
        category: Option<&str>,
        range: &DateRange,
    ) -> Result<Vec<PeriodTotal>> {
        range.check()?;
        let expenses = self.expenses_in_range(owner, category, range)?;
        debug!(owner, count = expenses.len(), %range, "Aggregating spending");
        aggregate::group_by_period(&expenses)
    }

    /// Spend recorded so far for one budget key
    pub fn period_total(&self, owner: &str, category: &str, period: Period) -> Result<Decimal> {
        let expenses = self.expenses_in_range(owner, Some(category), &period.range())?;
        aggregate::total(&expenses)
    }

    /// Total and per-category breakdown for a range
    pub fn spending_summary(
        &self,
        owner: &str,
        range: &DateRange,
        category: Option<&str>,
        rollup: bool,
    ) -> Result<SpendingSummary> {
        range.check()?;
        let expenses = self.expenses_in_range(owner, category, range)?;
        let map = if rollup {
            Some(aggregate::rollup_map(&self.category_hierarchy(owner)?))
        } else {
            None
        };
        aggregate::summarize(&expenses, *range, map.as_ref())
    }

    /// Monthly totals over a range
    pub fn spending_trends(
        &self,
        owner: &str,
        range: &DateRange,
        category: Option<&str>,
    ) -> Result<TrendsReport> {
        range.check()?;
        let expenses = self.expenses_in_range(owner, category, range)?;
        Ok(TrendsReport {
            range: *range,
            category: category.map(str::to_string),
            points: aggregate::trends(&expenses, *range)?,
        })
    }

    /// Day-by-day totals over a range of at most a year
    pub fn daily_totals(
        &self,
        owner: &str,
        range: &DateRange,
        category: Option<&str>,
    ) -> Result<DailyReport> {
        range.check()?;
        if range.days() > MAX_DAILY_DAYS {
            return Err(Error::validation(
                "range",
                format!("daily reports cover at most {} days", MAX_DAILY_DAYS),
            ));
        }
        let expenses = self.expenses_in_range(owner, category, range)?;
        aggregate::daily(&expenses, *range)
    }

    /// Compare spending between two ranges
    pub fn compare_ranges(
        &self,
        owner: &str,
        current: &DateRange,
        previous: &DateRange,
        category: Option<&str>,
    ) -> Result<PeriodComparison> {
        current.check()?;
        previous.check()?;
        let current_expenses = self.expenses_in_range(owner, category, current)?;
        let previous_expenses = self.expenses_in_range(owner, category, previous)?;
        aggregate::compare(
            (&current_expenses, *current),
            (&previous_expenses, *previous),
        )
    }

    /// Spend against each budget, optionally for one month
    pub fn budget_statuses(&self, owner: &str, period: Option<Period>) -> Result<Vec<BudgetStatus>> {
        self.list_budgets(owner, period)?
            .into_iter()
            .map(|budget| {
                let spent = self.period_total(owner, &budget.category, budget.period)?;
                Ok(aggregate::budget_status(budget, spent))
            })
            .collect()
    }
}
