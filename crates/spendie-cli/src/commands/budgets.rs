//! Budget and alert command implementations

use anyhow::Result;
use spendie_core::input::{parse_amount, parse_period};
use spendie_core::{Command, Period};

use super::App;

/// Parse `YYYY-MM`, or the month containing today when absent
pub fn resolve_budget_period(period: Option<&str>, app: &App) -> Result<Period> {
    Ok(match period {
        Some(p) => parse_period(p)?,
        None => Period::containing(app.today),
    })
}

pub fn cmd_budget_set(
    app: &App,
    category: &str,
    limit: &str,
    period: Option<&str>,
    replace: bool,
) -> Result<()> {
    let command = Command::SetBudget {
        category: category.to_string(),
        period: resolve_budget_period(period, app)?,
        limit: parse_amount(limit)?,
        replace,
    };
    app.run(command)?;
    Ok(())
}

pub fn cmd_budget_list(app: &App, period: Option<&str>, all: bool) -> Result<()> {
    let period = if all {
        None
    } else {
        Some(resolve_budget_period(period, app)?)
    };
    app.run(Command::ListBudgets { period })?;
    Ok(())
}

pub fn cmd_budget_delete(app: &App, category: &str, period: Option<&str>) -> Result<()> {
    let command = Command::DeleteBudget {
        category: category.to_string(),
        period: resolve_budget_period(period, app)?,
    };
    app.run(command)?;
    Ok(())
}

pub fn cmd_alerts(app: &App, period: Option<&str>) -> Result<()> {
    let period = period.map(parse_period).transpose()?;
    app.run(Command::ListAlerts { period })?;
    Ok(())
}
