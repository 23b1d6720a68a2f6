//! Domain models for Spendie

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::period::{DateRange, Period};

/// A recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub owner: String,
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub source: ExpenseSource,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// The budget key this expense counts towards
    pub fn period(&self) -> Period {
        Period::containing(self.date)
    }
}

/// Input for creating an expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Decimal,
    /// Falls back to the configured default category
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: ExpenseSource,
}

/// Partial update for an existing expense. `description: Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseChanges {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExpenseChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.description.is_none()
    }
}

/// How an expense was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseSource {
    /// Entered through the CLI or the command API
    #[default]
    Manual,
    /// Sent to the chat bot
    Chat,
    /// Loaded from a CSV file
    Import,
}

impl ExpenseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Chat => "chat",
            Self::Import => "import",
        }
    }
}

impl std::str::FromStr for ExpenseSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "chat" | "telegram" => Ok(Self::Chat),
            "import" | "csv" => Ok(Self::Import),
            _ => Err(format!("Unknown expense source: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpenseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filter for listing expenses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub range: Option<DateRange>,
    /// Case-insensitive match against the description
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// Falls back to the configured list limit
    #[serde(default)]
    pub limit: Option<usize>,
}

/// An expense category. Names are unique per owner, ignoring case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub owner: String,
    pub name: String,
    /// Grouping parent, if any
    pub parent: Option<String>,
    pub expense_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of deleting a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCategoryResult {
    pub category: String,
    pub reassigned_to: Option<String>,
    pub expenses_moved: i64,
    pub budgets_removed: i64,
    pub children_reparented: i64,
    /// Months whose spend moved to the reassignment target
    pub periods: Vec<Period>,
}

/// A monthly spending limit for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub owner: String,
    pub category: String,
    pub period: Period,
    pub limit: Decimal,
}

/// Outcome of storing a budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetWrite {
    pub budget: Budget,
    /// An existing budget for the same key was replaced
    pub replaced: bool,
    /// The limit changed, so the alert state for the key was reset
    pub reset: bool,
}

/// Budget with the spend recorded against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Spent divided by limit
    pub used: Decimal,
}

/// A recorded threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub owner: String,
    pub category: String,
    pub period: Period,
    /// Fraction of the limit that was crossed, e.g. 0.8
    pub threshold: Decimal,
    pub spent: Decimal,
    pub limit: Decimal,
    pub created_at: DateTime<Utc>,
}

// ========== Reports ==========

/// Total spend for one category in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub category: String,
    pub period: Period,
    pub total: Decimal,
    pub count: i64,
}

/// Spending for a single category in a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub amount: Decimal,
    /// Share of the summary total, percent rounded to one decimal
    pub percentage: Decimal,
    pub count: i64,
}

/// Spending summary report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub range: DateRange,
    pub total: Decimal,
    pub count: i64,
    pub categories: Vec<CategorySpending>,
}

/// A single month in a trends report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: Period,
    pub total: Decimal,
    pub count: i64,
}

/// Monthly spending over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendsReport {
    pub range: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub points: Vec<TrendPoint>,
}

/// Spend on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: Decimal,
}

/// Day-by-day spending pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub range: DateRange,
    pub days: Vec<DailyTotal>,
    pub total: Decimal,
    pub average: Decimal,
}

/// Total and count for one side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeTotal {
    pub range: DateRange,
    pub total: Decimal,
    pub count: i64,
}

/// Two ranges side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: RangeTotal,
    pub previous: RangeTotal,
    pub change: Decimal,
    /// None when the previous range had no spend
    pub change_percent: Option<Decimal>,
}

/// Result of a CSV import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: usize,
    pub total: Decimal,
}
