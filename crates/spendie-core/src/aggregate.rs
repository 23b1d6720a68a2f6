//! Aggregation engine
//!
//! Pure functions from fetched expense records to sums, breakdowns and
//! series. All arithmetic is exact decimal arithmetic; only percentages
//! and averages are rounded, and only for presentation. Sums are checked,
//! an overflowing total is a validation error rather than a panic.

use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::models::{
    Budget, BudgetStatus, CategorySpending, DailyReport, DailyTotal, Expense, PeriodComparison,
    PeriodTotal, RangeTotal, SpendingSummary, TrendPoint,
};
use crate::period::{DateRange, Period};

fn add(total: Decimal, amount: Decimal) -> Result<Decimal> {
    total.checked_add(amount).ok_or_else(|| {
        Error::validation("amount", "total is larger than the largest supported amount")
    })
}

/// Exact sum of expense amounts
pub fn total(expenses: &[Expense]) -> Result<Decimal> {
    expenses.iter().try_fold(Decimal::ZERO, |sum, e| add(sum, e.amount))
}

/// `part` as a percentage of `whole`, one decimal place
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole).round_dp(1)
}

/// Per-category, per-month totals ordered by month, then category name.
///
/// Category names compare case-insensitively; the first spelling seen wins.
pub fn group_by_period(expenses: &[Expense]) -> Result<Vec<PeriodTotal>> {
    let mut groups: BTreeMap<(Period, String), PeriodTotal> = BTreeMap::new();

    for expense in expenses {
        let key = (expense.period(), expense.category.to_lowercase());
        let entry = groups.entry(key).or_insert_with(|| PeriodTotal {
            category: expense.category.clone(),
            period: expense.period(),
            total: Decimal::ZERO,
            count: 0,
        });
        entry.total = add(entry.total, expense.amount)?;
        entry.count += 1;
    }

    Ok(groups.into_values().collect())
}

/// Map each category (lowercased) to its top-level ancestor's name
pub fn rollup_map(parents: &[(String, Option<String>)]) -> HashMap<String, String> {
    let by_name: HashMap<String, (&String, Option<&String>)> = parents
        .iter()
        .map(|(name, parent)| (name.to_lowercase(), (name, parent.as_ref())))
        .collect();

    let mut roots = HashMap::new();
    for (key, (name, _)) in &by_name {
        let mut current: &String = name;
        // Bounded walk, a malformed hierarchy cannot loop forever
        for _ in 0..by_name.len() {
            match by_name
                .get(&current.to_lowercase())
                .and_then(|(_, parent)| *parent)
            {
                Some(parent) => current = parent,
                None => break,
            }
        }
        roots.insert(key.clone(), current.clone());
    }
    roots
}

/// Total plus per-category breakdown, largest first.
///
/// With `rollup`, child categories count towards their top-level parent.
pub fn summarize(
    expenses: &[Expense],
    range: DateRange,
    rollup: Option<&HashMap<String, String>>,
) -> Result<SpendingSummary> {
    let mut groups: HashMap<String, CategorySpending> = HashMap::new();

    for expense in expenses {
        let name = rollup
            .and_then(|map| map.get(&expense.category.to_lowercase()))
            .unwrap_or(&expense.category);
        let entry = groups
            .entry(name.to_lowercase())
            .or_insert_with(|| CategorySpending {
                category: name.clone(),
                amount: Decimal::ZERO,
                percentage: Decimal::ZERO,
                count: 0,
            });
        entry.amount = add(entry.amount, expense.amount)?;
        entry.count += 1;
    }

    let total = total(expenses)?;
    let mut categories: Vec<CategorySpending> = groups
        .into_values()
        .map(|mut c| {
            c.percentage = percentage(c.amount, total);
            c
        })
        .collect();
    categories.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category.to_lowercase().cmp(&b.category.to_lowercase()))
    });

    Ok(SpendingSummary {
        range,
        total,
        count: expenses.len() as i64,
        categories,
    })
}

/// Monthly series from the first month with spend through the end of the
/// range, with empty months filled in as zero
pub fn trends(expenses: &[Expense], range: DateRange) -> Result<Vec<TrendPoint>> {
    let Some(first) = expenses.iter().map(Expense::period).min() else {
        return Ok(Vec::new());
    };

    let mut points: BTreeMap<Period, TrendPoint> = BTreeMap::new();
    let start = first.max(Period::containing(range.from));
    let end = Period::containing(range.to);
    let mut current = start;
    while current <= end {
        points.insert(
            current,
            TrendPoint {
                period: current,
                total: Decimal::ZERO,
                count: 0,
            },
        );
        let next = current.next();
        if next == current {
            break;
        }
        current = next;
    }

    for expense in expenses {
        if let Some(point) = points.get_mut(&expense.period()) {
            point.total = add(point.total, expense.amount)?;
            point.count += 1;
        }
    }

    Ok(points.into_values().collect())
}

/// Day-by-day totals over the range, zero-filled, with the daily average
pub fn daily(expenses: &[Expense], range: DateRange) -> Result<DailyReport> {
    let mut by_day: BTreeMap<chrono::NaiveDate, Decimal> = BTreeMap::new();
    let mut day = range.from;
    while day <= range.to {
        by_day.insert(day, Decimal::ZERO);
        day += Duration::days(1);
    }
    for expense in expenses {
        if let Some(total) = by_day.get_mut(&expense.date) {
            *total = add(*total, expense.amount)?;
        }
    }

    let total = by_day.values().try_fold(Decimal::ZERO, |sum, day| add(sum, *day))?;
    let average = if by_day.is_empty() {
        Decimal::ZERO
    } else {
        (total / Decimal::from(by_day.len() as i64)).round_dp(2)
    };

    Ok(DailyReport {
        range,
        days: by_day
            .into_iter()
            .map(|(date, total)| DailyTotal { date, total })
            .collect(),
        total,
        average,
    })
}

fn range_total(expenses: &[Expense], range: DateRange) -> Result<RangeTotal> {
    Ok(RangeTotal {
        range,
        total: total(expenses)?,
        count: expenses.len() as i64,
    })
}

/// Compare two ranges; the percent change is None without previous spend
pub fn compare(
    current: (&[Expense], DateRange),
    previous: (&[Expense], DateRange),
) -> Result<PeriodComparison> {
    let current = range_total(current.0, current.1)?;
    let previous = range_total(previous.0, previous.1)?;
    let change = current.total - previous.total;
    let change_percent = if previous.total.is_zero() {
        None
    } else {
        Some((change * Decimal::ONE_HUNDRED / previous.total).round_dp(1))
    };

    Ok(PeriodComparison {
        current,
        previous,
        change,
        change_percent,
    })
}

/// Spend against a budget. Remaining goes negative when over the limit.
pub fn budget_status(budget: Budget, spent: Decimal) -> BudgetStatus {
    let used = if budget.limit.is_zero() {
        Decimal::ZERO
    } else {
        (spent / budget.limit).round_dp(4)
    };
    BudgetStatus {
        remaining: budget.limit - spent,
        spent,
        used,
        budget,
    }
}
