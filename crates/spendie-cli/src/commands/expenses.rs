//! Expense command implementations (add, list, edit, delete)

use std::io::{self, Write};

use anyhow::Result;
use spendie_core::input::{parse_amount, parse_date};
use spendie_core::models::{ExpenseChanges, ExpenseFilter, ExpenseSource, NewExpense};
use spendie_core::{Command, DateRange};

use super::App;

pub fn cmd_add(
    app: &App,
    amount: &str,
    category: Option<&str>,
    date: &str,
    description: Option<&str>,
) -> Result<()> {
    let expense = NewExpense {
        amount: parse_amount(amount)?,
        category: category.map(str::to_string),
        date: parse_date(date, app.today)?,
        description: description.map(str::to_string),
        source: ExpenseSource::Manual,
    };
    app.run(Command::AddExpense(expense))?;
    Ok(())
}

pub fn cmd_list(
    app: &App,
    category: Option<&str>,
    period: Option<&str>,
    search: Option<&str>,
    min: Option<&str>,
    max: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let filter = ExpenseFilter {
        category: category.map(str::to_string),
        range: period
            .map(|p| DateRange::parse(p, app.today))
            .transpose()?,
        keyword: search.map(str::to_string),
        min_amount: min.map(parse_amount).transpose()?,
        max_amount: max.map(parse_amount).transpose()?,
        limit,
    };
    app.run(Command::ListExpenses(filter))?;
    Ok(())
}

pub fn cmd_edit(
    app: &App,
    id: i64,
    amount: Option<&str>,
    category: Option<&str>,
    date: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let changes = ExpenseChanges {
        amount: amount.map(parse_amount).transpose()?,
        category: category.map(str::to_string),
        date: date.map(|d| parse_date(d, app.today)).transpose()?,
        description: description.map(str::to_string),
    };
    app.run(Command::EditExpense { id, changes })?;
    Ok(())
}

pub fn cmd_delete(app: &App, id: i64) -> Result<()> {
    app.run(Command::DeleteExpense { id })?;
    Ok(())
}

pub fn cmd_delete_all(app: &App, yes: bool) -> Result<()> {
    if !yes {
        print!("⚠️  This will delete all of your expenses.\n");
        print!("   Budgets and categories will be preserved.\n\n");
        print!("Are you sure? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    app.run(Command::DeleteAllExpenses)?;
    Ok(())
}
