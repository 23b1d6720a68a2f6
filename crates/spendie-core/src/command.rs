//! Typed commands shared by every front end, and their outcomes
//!
//! The CLI, the JSON command API and the chat bot all translate their input
//! into a [`Command`]; the dispatcher answers with an [`Outcome`] that the
//! report formatter (or serde, for the API) renders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Alert, Budget, BudgetStatus, Category, DailyReport, DeleteCategoryResult, Expense,
    ExpenseChanges, ExpenseFilter, ImportStats, NewExpense, PeriodComparison, PeriodTotal,
    SpendingSummary, TrendsReport,
};
use crate::period::{DateRange, Period};

/// Every operation a front end can request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    AddExpense(NewExpense),
    EditExpense {
        id: i64,
        changes: ExpenseChanges,
    },
    DeleteExpense {
        id: i64,
    },
    DeleteAllExpenses,
    ListExpenses(ExpenseFilter),
    SetBudget {
        category: String,
        period: Period,
        limit: Decimal,
        /// Replace an existing budget instead of rejecting the duplicate
        #[serde(default)]
        replace: bool,
    },
    ListBudgets {
        #[serde(default)]
        period: Option<Period>,
    },
    DeleteBudget {
        category: String,
        period: Period,
    },
    GetReport(ReportRequest),
    ExportCsv {
        #[serde(default)]
        range: Option<DateRange>,
        #[serde(default)]
        category: Option<String>,
    },
    ImportCsv {
        content: String,
    },
    ListCategories,
    AddCategory {
        name: String,
        #[serde(default)]
        parent: Option<String>,
    },
    DeleteCategory {
        name: String,
        #[serde(default)]
        reassign_to: Option<String>,
    },
    ListAlerts {
        #[serde(default)]
        period: Option<Period>,
    },
    Help,
}

/// Command names as they appear in the `command` field
pub const COMMAND_NAMES: [&str; 17] = [
    "add_expense",
    "edit_expense",
    "delete_expense",
    "delete_all_expenses",
    "list_expenses",
    "set_budget",
    "list_budgets",
    "delete_budget",
    "get_report",
    "export_csv",
    "import_csv",
    "list_categories",
    "add_category",
    "delete_category",
    "list_alerts",
    "help",
    "start",
];

impl Command {
    /// Decode a JSON command.
    ///
    /// An unrecognized `command` name is an unknown-command error; a known
    /// name with bad fields is a validation error.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let name = value
            .get("command")
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::validation("command", "missing"))?
            .to_string();

        if name == "start" {
            return Ok(Self::Help);
        }
        if !COMMAND_NAMES.contains(&name.as_str()) {
            return Err(Error::UnknownCommand(name));
        }

        serde_json::from_value(value).map_err(|e| Error::validation(name, e.to_string()))
    }

    /// The `command` field this value serializes with
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddExpense(_) => "add_expense",
            Self::EditExpense { .. } => "edit_expense",
            Self::DeleteExpense { .. } => "delete_expense",
            Self::DeleteAllExpenses => "delete_all_expenses",
            Self::ListExpenses(_) => "list_expenses",
            Self::SetBudget { .. } => "set_budget",
            Self::ListBudgets { .. } => "list_budgets",
            Self::DeleteBudget { .. } => "delete_budget",
            Self::GetReport(_) => "get_report",
            Self::ExportCsv { .. } => "export_csv",
            Self::ImportCsv { .. } => "import_csv",
            Self::ListCategories => "list_categories",
            Self::AddCategory { .. } => "add_category",
            Self::DeleteCategory { .. } => "delete_category",
            Self::ListAlerts { .. } => "list_alerts",
            Self::Help => "help",
        }
    }

    /// Whether the command can change stored data
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::AddExpense(_)
                | Self::EditExpense { .. }
                | Self::DeleteExpense { .. }
                | Self::DeleteAllExpenses
                | Self::SetBudget { .. }
                | Self::DeleteBudget { .. }
                | Self::ImportCsv { .. }
                | Self::AddCategory { .. }
                | Self::DeleteCategory { .. }
        )
    }
}

/// What report to build and over which range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub range: DateRange,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub kind: ReportKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportKind {
    /// (category, month, total) rows
    Periods,
    /// Total with per-category breakdown
    #[default]
    Summary,
    /// Like summary, with child categories counted under their parent
    Rollup,
    /// Monthly series
    Trends,
    /// Day-by-day totals
    Daily,
    /// Against another range
    Compare { previous: DateRange },
}

/// Report payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Periods {
        range: DateRange,
        totals: Vec<PeriodTotal>,
    },
    Summary(SpendingSummary),
    Trends(TrendsReport),
    Daily(DailyReport),
    Comparison(PeriodComparison),
}

/// Result of a dispatched command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    ExpenseAdded {
        expense: Expense,
        alerts: Vec<Alert>,
    },
    ExpenseUpdated {
        expense: Expense,
        alerts: Vec<Alert>,
    },
    ExpenseDeleted {
        expense: Expense,
    },
    ExpensesCleared {
        deleted: usize,
    },
    Expenses {
        expenses: Vec<Expense>,
        total: Decimal,
    },
    BudgetSet {
        budget: Budget,
        replaced: bool,
        alerts: Vec<Alert>,
    },
    Budgets {
        period: Option<Period>,
        budgets: Vec<BudgetStatus>,
    },
    BudgetDeleted {
        budget: Budget,
    },
    Report {
        report: Report,
    },
    Csv {
        csv: String,
        rows: usize,
    },
    Imported {
        stats: ImportStats,
        alerts: Vec<Alert>,
    },
    Categories {
        categories: Vec<Category>,
    },
    CategoryAdded {
        category: Category,
    },
    CategoryDeleted {
        result: DeleteCategoryResult,
        alerts: Vec<Alert>,
    },
    Alerts {
        alerts: Vec<Alert>,
    },
    Help,
}

impl Outcome {
    /// Alerts raised by the command, if it was a write
    pub fn alerts(&self) -> &[Alert] {
        match self {
            Self::ExpenseAdded { alerts, .. }
            | Self::ExpenseUpdated { alerts, .. }
            | Self::BudgetSet { alerts, .. }
            | Self::Imported { alerts, .. }
            | Self::CategoryDeleted { alerts, .. } => alerts,
            _ => &[],
        }
    }
}
