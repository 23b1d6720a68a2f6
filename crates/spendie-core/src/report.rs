//! Text rendering of dispatcher outcomes and errors
//!
//! The same text is printed by the CLI and sent as chat replies.

use rust_decimal::Decimal;

use crate::command::{Outcome, Report};
use crate::error::{Error, ErrorKind};
use crate::models::{
    Alert, BudgetStatus, Category, DailyReport, Expense, PeriodComparison, PeriodTotal,
    SpendingSummary, TrendsReport,
};
use crate::period::Period;

const RULE: &str = "───────────────────────────────";

/// Chat help, also shown for `/start`
pub const HELP_TEXT: &str = "👋 Welcome to Spendie!

💸 Add expenses:
• spent 200 on groceries
• /add 50 food 2024-01-05 lunch
• /edit 3 amount=20 category=travel
• /delete 3

📊 Reports:
• /list [range] [category]
• /report [range] [category]
• /breakdown [range]
• /trends [range] [category]
• /patterns [days]
• /compare [range] [range]

🎯 Budgets:
• /budget [YYYY-MM | all]
• /budget set food 5000 [YYYY-MM]
• /budget update food 6000 [YYYY-MM]
• /budget delete food [YYYY-MM]
• /alerts [YYYY-MM]

🏷️ Categories:
• /categories
• /category add snacks food
• /category delete snacks food

📤 /export [range]   🗑️ /delete_all

Ranges: today, yesterday, this-week, last-week, this-month, last-month, this-year, last-30-days, all, YYYY-MM or FROM..TO";

/// Renders outcomes with a configured currency symbol
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    currency: String,
}

impl ReportFormatter {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
        }
    }

    /// Amount with the currency symbol, two decimals and thousands separators
    pub fn money(&self, amount: Decimal) -> String {
        let rounded = format!("{:.2}", amount.round_dp(2).abs());
        let (whole, fraction) = rounded.split_once('.').unwrap_or((&rounded, "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if amount.is_sign_negative() && !amount.round_dp(2).is_zero() {
            "-"
        } else {
            ""
        };
        format!("{}{}{}.{}", sign, self.currency, grouped, fraction)
    }

    pub fn render(&self, outcome: &Outcome) -> String {
        let mut lines = match outcome {
            Outcome::ExpenseAdded { expense, .. } => {
                let mut lines = vec![format!("✅ Expense added (#{})", expense.id)];
                lines.extend(self.expense_details(expense));
                lines
            }
            Outcome::ExpenseUpdated { expense, .. } => {
                let mut lines = vec![format!("✏️ Expense #{} updated", expense.id)];
                lines.extend(self.expense_details(expense));
                lines
            }
            Outcome::ExpenseDeleted { expense } => vec![format!(
                "🗑️ Deleted expense #{}: {} on {} ({})",
                expense.id,
                self.money(expense.amount),
                expense.category,
                expense.date
            )],
            Outcome::ExpensesCleared { deleted } => {
                vec![format!("🗑️ Deleted {}.", plural(*deleted as i64, "expense"))]
            }
            Outcome::Expenses { expenses, total } => self.expenses(expenses, *total),
            Outcome::BudgetSet {
                budget, replaced, ..
            } => vec![format!(
                "✅ Budget {}: {} for {}, limit {}",
                if *replaced { "updated" } else { "set" },
                budget.category,
                budget.period,
                self.money(budget.limit)
            )],
            Outcome::Budgets { period, budgets } => self.budgets(period.as_ref(), budgets),
            Outcome::BudgetDeleted { budget } => vec![format!(
                "🗑️ Removed the {} budget for {}",
                budget.category, budget.period
            )],
            Outcome::Report { report } => match report {
                Report::Periods { range, totals } => self.period_totals(&range.to_string(), totals),
                Report::Summary(summary) => self.summary(summary),
                Report::Trends(trends) => self.trends(trends),
                Report::Daily(daily) => self.daily(daily),
                Report::Comparison(comparison) => self.comparison(comparison),
            },
            Outcome::Csv { csv, rows } => vec![
                format!("📤 Exported {}", plural(*rows as i64, "expense")),
                String::new(),
                csv.trim_end().to_string(),
            ],
            Outcome::Imported { stats, .. } => vec![format!(
                "📥 Imported {} totalling {}",
                plural(stats.imported as i64, "expense"),
                self.money(stats.total)
            )],
            Outcome::Categories { categories } => self.categories(categories),
            Outcome::CategoryAdded { category } => vec![match &category.parent {
                Some(parent) => format!("✅ Category added: {} (under {})", category.name, parent),
                None => format!("✅ Category added: {}", category.name),
            }],
            Outcome::CategoryDeleted { result, .. } => {
                let mut lines = vec![format!("🗑️ Deleted category {}", result.category)];
                if let Some(target) = &result.reassigned_to {
                    lines.push(format!(
                        "   Moved {} to {}",
                        plural(result.expenses_moved, "expense"),
                        target
                    ));
                }
                if result.budgets_removed > 0 {
                    lines.push(format!(
                        "   Removed {}",
                        plural(result.budgets_removed, "budget")
                    ));
                }
                lines
            }
            Outcome::Alerts { alerts } => {
                if alerts.is_empty() {
                    vec!["🔕 No budget alerts".to_string()]
                } else {
                    let mut lines = vec!["🔔 Budget alerts:".to_string()];
                    for alert in alerts {
                        lines.push(format!(
                            "• {} {}: {} reached on {} ({} of {})",
                            alert.period,
                            alert.category,
                            percent(alert.threshold),
                            alert.created_at.format("%Y-%m-%d"),
                            self.money(alert.spent),
                            self.money(alert.limit)
                        ));
                    }
                    lines
                }
            }
            Outcome::Help => vec![HELP_TEXT.to_string()],
        };

        let alerts = outcome.alerts();
        if !alerts.is_empty() {
            lines.push(String::new());
            lines.extend(alerts.iter().map(|a| self.alert(a)));
        }
        lines.join("\n")
    }

    /// User-facing text for an error. Storage failures never show internals.
    pub fn render_error(&self, err: &Error) -> String {
        match (err.kind(), err) {
            (_, Error::UnknownCommand(_)) => {
                format!("🤔 {}\nSend /help to see what I understand.", err)
            }
            (ErrorKind::Validation, _) => format!("❌ {}", err),
            (ErrorKind::NotFound, _) => format!("🔍 {}", err),
            (ErrorKind::Conflict, _) => format!("⚠️ {}", err),
            (ErrorKind::Storage, Error::Unavailable { .. }) => format!("❌ {}", err),
            (ErrorKind::Storage, _) => "❌ Something went wrong. Please try again.".to_string(),
        }
    }

    /// One line announcing a crossed threshold
    pub fn alert(&self, alert: &Alert) -> String {
        if alert.threshold >= Decimal::ONE {
            format!(
                "🚨 Budget exceeded: {} has used {} of its {} budget ({} of {})",
                alert.category,
                percent(alert.threshold),
                alert.period,
                self.money(alert.spent),
                self.money(alert.limit)
            )
        } else {
            format!(
                "⚠️ Budget warning: {} has used {} of its {} budget ({} of {})",
                alert.category,
                percent(alert.threshold),
                alert.period,
                self.money(alert.spent),
                self.money(alert.limit)
            )
        }
    }

    fn expense_details(&self, expense: &Expense) -> Vec<String> {
        let mut lines = vec![
            format!("💸 Amount: {}", self.money(expense.amount)),
            format!("🏷️ Category: {}", expense.category),
            format!("📅 Date: {}", expense.date),
        ];
        if let Some(description) = &expense.description {
            lines.push(format!("📝 Description: {}", description));
        }
        lines
    }

    fn expenses(&self, expenses: &[Expense], total: Decimal) -> Vec<String> {
        if expenses.is_empty() {
            return vec!["📭 No expenses found".to_string()];
        }
        let mut lines = vec!["📋 Expenses:".to_string()];
        for expense in expenses {
            let mut line = format!(
                "#{} {} {} {}",
                expense.id,
                expense.date,
                self.money(expense.amount),
                expense.category
            );
            if let Some(description) = &expense.description {
                line.push_str(" - ");
                line.push_str(description);
            }
            lines.push(line);
        }
        lines.push(format!(
            "💰 Total: {} ({})",
            self.money(total),
            plural(expenses.len() as i64, "expense")
        ));
        lines
    }

    fn budgets(&self, period: Option<&Period>, budgets: &[BudgetStatus]) -> Vec<String> {
        if budgets.is_empty() {
            return vec![match period {
                Some(period) => format!("📭 No budgets for {}", period),
                None => "📭 No budgets yet".to_string(),
            }];
        }
        let mut lines = vec![match period {
            Some(period) => format!("🎯 Budgets for {}:", period),
            None => "🎯 Budgets:".to_string(),
        }];
        for status in budgets {
            let left = if status.remaining.is_sign_negative() {
                format!("{} over", self.money(-status.remaining))
            } else {
                format!("{} left", self.money(status.remaining))
            };
            lines.push(format!(
                "• {} {}: {} of {} ({}) - {}",
                status.budget.period,
                status.budget.category,
                self.money(status.spent),
                self.money(status.budget.limit),
                percent(status.used),
                left
            ));
        }
        lines
    }

    fn period_totals(&self, range: &str, totals: &[PeriodTotal]) -> Vec<String> {
        let mut lines = vec![
            "📊 Spending by Month".to_string(),
            format!("   Period: {}", range),
            RULE.to_string(),
        ];
        if totals.is_empty() {
            lines.push("📭 No spending found in this period.".to_string());
            return lines;
        }
        for total in totals {
            lines.push(format!(
                "• {} {}: {} ({})",
                total.period,
                total.category,
                self.money(total.total),
                total.count
            ));
        }
        lines
    }

    fn summary(&self, summary: &SpendingSummary) -> Vec<String> {
        let mut lines = vec![
            "📊 Spending Summary".to_string(),
            format!("   Period: {}", summary.range),
            RULE.to_string(),
        ];
        if summary.count == 0 {
            lines.push("📭 No spending found in this period.".to_string());
            return lines;
        }
        lines.push(format!(
            "💰 Total: {} ({})",
            self.money(summary.total),
            plural(summary.count, "expense")
        ));
        lines.push(String::new());
        lines.push("Top categories:".to_string());
        for category in &summary.categories {
            lines.push(format!(
                "• {}: {} ({}%, {})",
                category.category,
                self.money(category.amount),
                category.percentage,
                category.count
            ));
        }
        lines
    }

    fn trends(&self, trends: &TrendsReport) -> Vec<String> {
        let mut lines = vec!["📈 Spending Trends".to_string()];
        if let Some(category) = &trends.category {
            lines.push(format!("   Category: {}", category));
        }
        lines.push(format!("   Period: {}", trends.range));
        lines.push(RULE.to_string());
        if trends.points.is_empty() {
            lines.push("📭 No spending data found.".to_string());
            return lines;
        }
        let mut total = Decimal::ZERO;
        for point in &trends.points {
            total += point.total;
            lines.push(format!(
                "• {}: {} ({})",
                point.period,
                self.money(point.total),
                point.count
            ));
        }
        let average = total / Decimal::from(trends.points.len() as i64);
        lines.push(format!("📊 Monthly Average: {}", self.money(average)));
        lines
    }

    fn daily(&self, daily: &DailyReport) -> Vec<String> {
        let mut lines = vec![format!("📈 Last {} Days Spending:", daily.days.len())];
        for day in &daily.days {
            lines.push(format!("• {}: {}", day.date, self.money(day.total)));
        }
        lines.push(String::new());
        lines.push(format!("📊 Total: {}", self.money(daily.total)));
        lines.push(format!("📈 Daily Average: {}", self.money(daily.average)));
        lines
    }

    fn comparison(&self, comparison: &PeriodComparison) -> Vec<String> {
        let current = &comparison.current;
        let previous = &comparison.previous;
        let mut lines = vec![
            "📊 Spending Comparison".to_string(),
            RULE.to_string(),
            format!(
                "• {}: {} ({})",
                current.range,
                self.money(current.total),
                plural(current.count, "expense")
            ),
            format!(
                "• {}: {} ({})",
                previous.range,
                self.money(previous.total),
                plural(previous.count, "expense")
            ),
        ];
        let arrow = if comparison.change.is_sign_positive() && !comparison.change.is_zero() {
            "🔺"
        } else if comparison.change.is_zero() {
            "➖"
        } else {
            "🔻"
        };
        let sign = if comparison.change > Decimal::ZERO { "+" } else { "" };
        lines.push(match comparison.change_percent {
            Some(pct) => format!(
                "{} Change: {}{} ({}{}%)",
                arrow,
                sign,
                self.money(comparison.change),
                sign,
                pct
            ),
            None => format!(
                "{} Change: {}{} (no spending to compare against)",
                arrow,
                sign,
                self.money(comparison.change)
            ),
        });
        lines
    }

    fn categories(&self, categories: &[Category]) -> Vec<String> {
        if categories.is_empty() {
            return vec!["📭 No categories yet".to_string()];
        }
        let mut lines = vec!["🏷️ Categories:".to_string()];
        for category in categories {
            let count = plural(category.expense_count, "expense");
            lines.push(match &category.parent {
                Some(parent) => format!("• {} (under {}): {}", category.name, parent, count),
                None => format!("• {}: {}", category.name, count),
            });
        }
        lines
    }
}

/// A fraction as a whole percentage, e.g. 0.8 -> "80%"
fn percent(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).round_dp(1).normalize())
}

fn plural(count: i64, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
