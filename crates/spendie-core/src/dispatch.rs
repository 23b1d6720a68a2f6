//! Command dispatcher shared by the CLI, the command API and the chat bot
//!
//! Validates a [`Command`], runs it against the store, re-evaluates every
//! budget key the write touched and returns an [`Outcome`] for rendering.
//!
//! Budget evaluation happens after the write has committed. If it fails the
//! outcome is still returned; the monitor compares against the last recorded
//! threshold, so the key catches up the next time it is evaluated.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::aggregate;
use crate::command::{Command, Outcome, Report, ReportKind, ReportRequest};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::export::{parse_csv, write_csv};
use crate::input::{check_amount, check_date, normalize_category, normalize_description};
use crate::models::{Alert, ExpenseChanges, ExpenseFilter, ImportStats, NewExpense};
use crate::monitor::BudgetMonitor;
use crate::period::{DateRange, Period};

#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    monitor: BudgetMonitor,
    default_category: String,
    list_limit: usize,
}

impl Dispatcher {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            monitor: BudgetMonitor::new(db.clone(), &config.alerts.thresholds),
            db,
            default_category: config.default_category.clone(),
            list_limit: config.list_limit.max(1),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn monitor(&self) -> &BudgetMonitor {
        &self.monitor
    }

    /// Run one command for an owner
    pub fn dispatch(&self, owner: &str, command: Command) -> Result<Outcome> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(Error::validation("owner", "missing"));
        }
        debug!(
            owner,
            command = command.name(),
            write = command.is_write(),
            "Dispatching command"
        );

        match command {
            Command::AddExpense(expense) => self.add_expense(owner, expense),
            Command::EditExpense { id, changes } => self.edit_expense(owner, id, changes),
            Command::DeleteExpense { id } => {
                let expense = self.store("delete the expense", |db| db.delete_expense(owner, id))?;
                Ok(Outcome::ExpenseDeleted { expense })
            }
            Command::DeleteAllExpenses => {
                let deleted =
                    self.store("delete your expenses", |db| db.delete_all_expenses(owner))?;
                Ok(Outcome::ExpensesCleared { deleted })
            }
            Command::ListExpenses(filter) => self.list_expenses(owner, filter),
            Command::SetBudget {
                category,
                period,
                limit,
                replace,
            } => {
                let category = normalize_category(&category)?;
                let limit = check_amount("limit", limit)?;
                let written = self.store("save the budget", |db| {
                    db.set_budget(owner, &category, period, limit, replace)
                })?;
                let alerts =
                    self.evaluate_keys(owner, vec![(written.budget.category.clone(), period)]);
                Ok(Outcome::BudgetSet {
                    budget: written.budget,
                    replaced: written.replaced,
                    alerts,
                })
            }
            Command::ListBudgets { period } => {
                let budgets =
                    self.store("load budgets", |db| db.budget_statuses(owner, period))?;
                Ok(Outcome::Budgets { period, budgets })
            }
            Command::DeleteBudget { category, period } => {
                let category = normalize_category(&category)?;
                let budget = self.store("delete the budget", |db| {
                    db.delete_budget(owner, &category, period)
                })?;
                Ok(Outcome::BudgetDeleted { budget })
            }
            Command::GetReport(request) => {
                let report = self.report(owner, request)?;
                Ok(Outcome::Report { report })
            }
            Command::ExportCsv { range, category } => {
                let range = range.unwrap_or_else(DateRange::all_time);
                range.check()?;
                let category = optional_category(category)?;
                let expenses = self.store("export expenses", |db| {
                    db.expenses_in_range(owner, category.as_deref(), &range)
                })?;
                let csv = write_csv(&expenses)?;
                Ok(Outcome::Csv {
                    csv,
                    rows: expenses.len(),
                })
            }
            Command::ImportCsv { content } => self.import_csv(owner, &content),
            Command::ListCategories => {
                let categories = self.store("load categories", |db| db.list_categories(owner))?;
                Ok(Outcome::Categories { categories })
            }
            Command::AddCategory { name, parent } => {
                let name = normalize_category(&name)?;
                let parent = optional_category(parent)?;
                let category = self.store("save the category", |db| {
                    db.create_category(owner, &name, parent.as_deref())
                })?;
                Ok(Outcome::CategoryAdded { category })
            }
            Command::DeleteCategory { name, reassign_to } => {
                let name = normalize_category(&name)?;
                let reassign_to = optional_category(reassign_to)?;
                let result = self.store("delete the category", |db| {
                    db.delete_category(owner, &name, reassign_to.as_deref())
                })?;
                let alerts = match &result.reassigned_to {
                    Some(target) => self.evaluate_keys(
                        owner,
                        result.periods.iter().map(|p| (target.clone(), *p)).collect(),
                    ),
                    None => Vec::new(),
                };
                Ok(Outcome::CategoryDeleted { result, alerts })
            }
            Command::ListAlerts { period } => {
                let alerts = self.store("load alerts", |db| db.list_alerts(owner, period))?;
                Ok(Outcome::Alerts { alerts })
            }
            Command::Help => Ok(Outcome::Help),
        }
    }

    fn add_expense(&self, owner: &str, expense: NewExpense) -> Result<Outcome> {
        let expense = NewExpense {
            amount: check_amount("amount", expense.amount)?,
            category: Some(match expense.category {
                Some(name) => normalize_category(&name)?,
                None => self.default_category.clone(),
            }),
            date: check_date(expense.date)?,
            description: normalize_description(expense.description.as_deref()),
            source: expense.source,
        };

        let created = self.store("save the expense", |db| db.add_expense(owner, &expense))?;
        let alerts = self.evaluate_keys(owner, vec![(created.category.clone(), created.period())]);
        Ok(Outcome::ExpenseAdded {
            expense: created,
            alerts,
        })
    }

    fn edit_expense(&self, owner: &str, id: i64, changes: ExpenseChanges) -> Result<Outcome> {
        if changes.is_empty() {
            return Err(Error::validation(
                "changes",
                "nothing to change (amount, category, date or description)",
            ));
        }
        let changes = ExpenseChanges {
            amount: changes
                .amount
                .map(|a| check_amount("amount", a))
                .transpose()?,
            category: optional_category(changes.category)?,
            date: changes.date.map(check_date).transpose()?,
            description: changes.description.map(|d| d.trim().to_string()),
        };

        let (before, after) = self.store("update the expense", |db| {
            db.update_expense(owner, id, &changes)
        })?;
        let alerts = self.evaluate_keys(
            owner,
            vec![
                (before.category.clone(), before.period()),
                (after.category.clone(), after.period()),
            ],
        );
        Ok(Outcome::ExpenseUpdated {
            expense: after,
            alerts,
        })
    }

    fn list_expenses(&self, owner: &str, filter: ExpenseFilter) -> Result<Outcome> {
        if let Some(range) = &filter.range {
            range.check()?;
        }
        if filter.limit == Some(0) {
            return Err(Error::validation("limit", "must be at least 1"));
        }
        if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount) {
            if min > max {
                return Err(Error::validation(
                    "min_amount",
                    format!("{} is above max_amount {}", min, max),
                ));
            }
        }
        let filter = ExpenseFilter {
            category: optional_category(filter.category)?,
            keyword: filter
                .keyword
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            limit: Some(filter.limit.unwrap_or(self.list_limit)),
            ..filter
        };

        let expenses = self.store("load expenses", |db| db.list_expenses(owner, &filter))?;
        let total = aggregate::total(&expenses)?;
        Ok(Outcome::Expenses { expenses, total })
    }

    fn report(&self, owner: &str, request: ReportRequest) -> Result<Report> {
        let ReportRequest {
            range,
            category,
            kind,
        } = request;
        range.check()?;
        let category = optional_category(category)?;
        let category = category.as_deref();

        let report = match kind {
            ReportKind::Periods => Report::Periods {
                range,
                totals: self.store("build the report", |db| {
                    db.aggregate_spending(owner, category, &range)
                })?,
            },
            ReportKind::Summary | ReportKind::Rollup => {
                let rollup = matches!(kind, ReportKind::Rollup);
                Report::Summary(self.store("build the report", |db| {
                    db.spending_summary(owner, &range, category, rollup)
                })?)
            }
            ReportKind::Trends => Report::Trends(self.store("build the report", |db| {
                db.spending_trends(owner, &range, category)
            })?),
            ReportKind::Daily => Report::Daily(self.store("build the report", |db| {
                db.daily_totals(owner, &range, category)
            })?),
            ReportKind::Compare { previous } => {
                Report::Comparison(self.store("build the report", |db| {
                    db.compare_ranges(owner, &range, &previous, category)
                })?)
            }
        };
        Ok(report)
    }

    fn import_csv(&self, owner: &str, content: &str) -> Result<Outcome> {
        let rows = parse_csv(content)?;
        let created = if rows.is_empty() {
            Vec::new()
        } else {
            self.store("import expenses", |db| db.import_expenses(owner, &rows))?
        };

        let keys = created
            .iter()
            .map(|e| (e.category.clone(), e.period()))
            .collect();
        let alerts = self.evaluate_keys(owner, keys);
        let stats = ImportStats {
            imported: created.len(),
            total: aggregate::total(&created)?,
        };
        Ok(Outcome::Imported { stats, alerts })
    }

    /// Run a store operation, retrying once if it failed transiently.
    ///
    /// Each store call is its own transaction, so a failed attempt left
    /// nothing behind and a committed one is never repeated.
    fn store<T>(&self, operation: &str, f: impl Fn(&Database) -> Result<T>) -> Result<T> {
        retry_once(operation, || f(&self.db))
    }

    /// Evaluate each distinct (category, period) key once
    fn evaluate_keys(&self, owner: &str, keys: Vec<(String, Period)>) -> Vec<Alert> {
        collect_alerts(owner, keys, |category, period| {
            self.store("check your budgets", |_| {
                self.monitor.evaluate(owner, category, period)
            })
        })
    }
}

/// Run `f`, and run it again if the first attempt failed transiently.
///
/// A second transient failure surfaces as [`Error::Unavailable`].
fn retry_once<T>(operation: &str, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    match f() {
        Err(err) if err.is_transient() => {
            warn!(operation, error = %err, "Store operation failed, retrying");
            f().map_err(|err| {
                if err.is_transient() {
                    Error::Unavailable {
                        operation: operation.to_string(),
                        source: Box::new(err),
                    }
                } else {
                    err
                }
            })
        }
        result => result,
    }
}

/// Alerts from evaluating each distinct key. A key whose evaluation fails
/// is logged and skipped; the write it follows has already committed.
fn collect_alerts(
    owner: &str,
    keys: Vec<(String, Period)>,
    mut evaluate: impl FnMut(&str, Period) -> Result<Option<Alert>>,
) -> Vec<Alert> {
    let mut seen = HashSet::new();
    let mut alerts = Vec::new();
    for (category, period) in keys {
        if !seen.insert((category.to_lowercase(), period)) {
            continue;
        }
        match evaluate(&category, period) {
            Ok(Some(alert)) => alerts.push(alert),
            Ok(None) => {}
            Err(err) => {
                warn!(owner, %category, %period, error = %err, "Budget check failed");
            }
        }
    }
    alerts
}

fn optional_category(name: Option<String>) -> Result<Option<String>> {
    name.map(|n| normalize_category(&n)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ExpenseSource;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Database::in_memory().unwrap(), &Config::default())
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn add(amount: Decimal, category: Option<&str>, day: u32) -> Command {
        Command::AddExpense(NewExpense {
            amount,
            category: category.map(str::to_string),
            date: jan(day),
            description: None,
            source: ExpenseSource::Manual,
        })
    }

    #[test]
    fn test_owner_required() {
        let d = dispatcher();
        let err = d.dispatch("  ", Command::Help).unwrap_err();
        assert_eq!(err.to_string(), "invalid owner: missing");
    }

    #[test]
    fn test_default_category() {
        let d = dispatcher();
        match d.dispatch("u1", add(dec!(12), None, 3)).unwrap() {
            Outcome::ExpenseAdded { expense, alerts } => {
                assert_eq!(expense.category, "miscellaneous");
                assert!(alerts.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_validation_names_field() {
        let d = dispatcher();
        let err = d.dispatch("u1", add(dec!(-3), Some("Food"), 3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().starts_with("invalid amount"));

        let err = d
            .dispatch(
                "u1",
                Command::SetBudget {
                    category: "Food".into(),
                    period: Period::new(2024, 1).unwrap(),
                    limit: dec!(0),
                    replace: false,
                },
            )
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid limit"));

        let err = d
            .dispatch(
                "u1",
                Command::EditExpense {
                    id: 1,
                    changes: ExpenseChanges::default(),
                },
            )
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid changes"));
    }

    #[test]
    fn test_edit_into_budgeted_category_alerts() {
        let d = dispatcher();
        d.dispatch(
            "u1",
            Command::SetBudget {
                category: "Food".into(),
                period: Period::new(2024, 1).unwrap(),
                limit: dec!(100),
                replace: false,
            },
        )
        .unwrap();
        let id = match d.dispatch("u1", add(dec!(90), Some("Travel"), 4)).unwrap() {
            Outcome::ExpenseAdded { expense, .. } => expense.id,
            other => panic!("unexpected outcome: {:?}", other),
        };

        let outcome = d
            .dispatch(
                "u1",
                Command::EditExpense {
                    id,
                    changes: ExpenseChanges {
                        category: Some("food".into()),
                        ..Default::default()
                    },
                },
            )
            .unwrap();
        let alerts = outcome.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].threshold, dec!(0.8));
    }

    #[test]
    fn test_budget_over_existing_spend_alerts_immediately() {
        let d = dispatcher();
        d.dispatch("u1", add(dec!(120), Some("Food"), 2)).unwrap();
        let outcome = d
            .dispatch(
                "u1",
                Command::SetBudget {
                    category: "Food".into(),
                    period: Period::new(2024, 1).unwrap(),
                    limit: dec!(100),
                    replace: false,
                },
            )
            .unwrap();
        assert_eq!(outcome.alerts()[0].threshold, dec!(1));
    }

    #[test]
    fn test_list_uses_configured_limit() {
        let d = dispatcher();
        for day in 1..=12 {
            d.dispatch("u1", add(dec!(1), Some("Food"), day)).unwrap();
        }
        match d
            .dispatch("u1", Command::ListExpenses(ExpenseFilter::default()))
            .unwrap()
        {
            Outcome::Expenses { expenses, total } => {
                assert_eq!(expenses.len(), 10);
                assert_eq!(total, dec!(10));
                assert_eq!(expenses[0].date, jan(12));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_reassigning_delete_evaluates_target() {
        let d = dispatcher();
        d.dispatch(
            "u1",
            Command::SetBudget {
                category: "Food".into(),
                period: Period::new(2024, 1).unwrap(),
                limit: dec!(50),
                replace: false,
            },
        )
        .unwrap();
        d.dispatch("u1", add(dec!(60), Some("Snacks"), 8)).unwrap();

        let outcome = d
            .dispatch(
                "u1",
                Command::DeleteCategory {
                    name: "Snacks".into(),
                    reassign_to: Some("Food".into()),
                },
            )
            .unwrap();
        assert_eq!(outcome.alerts().len(), 1);
        assert_eq!(outcome.alerts()[0].category, "Food");
    }

    fn busy() -> Error {
        Error::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ))
    }

    #[test]
    fn test_retry_once_recovers_from_transient_failure() {
        let attempts = Cell::new(0);
        let result = retry_once("save the expense", || {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 1 {
                Err(busy())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_retry_once_gives_up_after_second_failure() {
        let attempts = Cell::new(0);
        let err = retry_once("save the expense", || -> Result<()> {
            attempts.set(attempts.get() + 1);
            Err(busy())
        })
        .unwrap_err();

        assert_eq!(attempts.get(), 2);
        assert!(matches!(err, Error::Unavailable { .. }));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.to_string(), "could not save the expense, please try again");
    }

    #[test]
    fn test_retry_once_skips_permanent_errors() {
        let attempts = Cell::new(0);
        let err = retry_once("delete the expense", || -> Result<()> {
            attempts.set(attempts.get() + 1);
            Err(Error::not_found("expense", 9))
        })
        .unwrap_err();

        assert_eq!(attempts.get(), 1);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_failed_budget_check_keeps_other_alerts() {
        let jan = Period::new(2024, 1).unwrap();
        let keys = vec![
            ("Food".to_string(), jan),
            ("food".to_string(), jan),
            ("Rent".to_string(), jan),
        ];
        let mut evaluated = Vec::new();

        let alerts = collect_alerts("u1", keys, |category, period| {
            evaluated.push(category.to_string());
            if category == "Food" {
                return Err(busy());
            }
            Ok(Some(Alert {
                id: 1,
                owner: "u1".into(),
                category: category.into(),
                period,
                threshold: dec!(0.8),
                spent: dec!(800),
                limit: dec!(1000),
                created_at: Utc::now(),
            }))
        });

        // Case variants of one key are evaluated once
        assert_eq!(evaluated, vec!["Food", "Rent"]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, "Rent");
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let d = dispatcher();
        let err = d
            .dispatch(
                "u1",
                add(dec!(50000000000000000000000000000), Some("Food"), 3),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().starts_with("invalid amount"));

        d.dispatch("u1", add(dec!(1000000000000000), Some("Food"), 3))
            .unwrap();
        d.dispatch("u1", add(dec!(1000000000000000), Some("Food"), 4))
            .unwrap();
        let jan = Period::new(2024, 1).unwrap();
        assert_eq!(
            d.database().period_total("u1", "Food", jan).unwrap(),
            dec!(2000000000000000)
        );
    }

    #[test]
    fn test_non_ascii_case_variants_share_a_budget() {
        let d = dispatcher();
        d.dispatch(
            "u1",
            Command::SetBudget {
                category: "ÉPICERIE".into(),
                period: Period::new(2024, 1).unwrap(),
                limit: dec!(100),
                replace: false,
            },
        )
        .unwrap();

        let outcome = d.dispatch("u1", add(dec!(90), Some("épicerie"), 5)).unwrap();
        match &outcome {
            Outcome::ExpenseAdded { expense, alerts } => {
                assert_eq!(expense.category, "ÉPICERIE");
                assert_eq!(alerts.len(), 1);
                assert_eq!(alerts[0].threshold, dec!(0.8));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(d.database().list_categories("u1").unwrap().len(), 1);
    }
}
