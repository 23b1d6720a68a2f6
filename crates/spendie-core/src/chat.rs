//! Chat bot front end
//!
//! Translates slash commands (`/add 50 food lunch`, `/report last-month`)
//! and informal phrases (`spent 50 on coffee`) into [`Command`] values, then
//! renders the dispatcher's answer as a chat reply.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::command::{Command, Outcome, ReportKind, ReportRequest};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::input::{parse_amount, parse_date, parse_id, parse_period};
use crate::models::{ExpenseChanges, ExpenseFilter, ExpenseSource, NewExpense};
use crate::period::{DateRange, Period};
use crate::report::ReportFormatter;

/// Days covered by `/patterns` without an argument
const PATTERN_DAYS: i64 = 7;

fn informal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:spent|paid)\s+((?:₹|rs\.?|inr|\$)?\s*[\d,]+(?:\.\d+)?)\s+(?:on|for)\s+(.+)$",
        )
        .expect("valid regex")
    })
}

/// Parses chat messages relative to a fixed "today"
pub struct ChatParser {
    today: NaiveDate,
}

impl ChatParser {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Parse one message into a command
    pub fn parse(&self, text: &str) -> Result<Command> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("message", "empty"));
        }

        if let Some(caps) = informal_pattern().captures(text) {
            return self.informal_expense(&caps[1], &caps[2]);
        }

        let mut words = text.split_whitespace();
        let first = words.next().unwrap_or_default();
        let name = first
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let args: Vec<&str> = words.collect();
        debug!(command = %name, args = args.len(), "Parsing chat command");

        match name.as_str() {
            "start" | "help" => Ok(Command::Help),
            "add" => self.add(&args),
            "list" => self.list(&args),
            "budget" | "budgets" => self.budget(&args),
            "report" => self.report(&args, ReportKind::Summary, DateRange::this_month(self.today)),
            "rollup" => self.report(&args, ReportKind::Rollup, DateRange::this_month(self.today)),
            "breakdown" => {
                self.report(&args, ReportKind::Periods, DateRange::this_month(self.today))
            }
            "trends" => self.report(
                &args,
                ReportKind::Trends,
                DateRange::parse("last-12-months", self.today)?,
            ),
            "patterns" => self.patterns(&args),
            "compare" => self.compare(&args),
            "export" => Ok(Command::ExportCsv {
                range: args
                    .first()
                    .map(|r| DateRange::parse(r, self.today))
                    .transpose()?,
                category: args.get(1).map(|c| c.to_string()),
            }),
            "categories" => Ok(Command::ListCategories),
            "category" => self.category(&args),
            "alerts" => Ok(Command::ListAlerts {
                period: args.first().map(|p| parse_period(p)).transpose()?,
            }),
            "delete" => Ok(Command::DeleteExpense {
                id: parse_id(args.first().ok_or_else(|| Error::validation("id", "missing"))?)?,
            }),
            "edit" => self.edit(&args),
            "delete_all" | "deleteall" => Ok(Command::DeleteAllExpenses),
            _ => Err(Error::UnknownCommand(name)),
        }
    }

    fn informal_expense(&self, amount: &str, rest: &str) -> Result<Command> {
        let rest = rest.trim();
        let category = rest
            .split_whitespace()
            .next()
            .unwrap_or(rest)
            .trim_end_matches(|c: char| c.is_ascii_punctuation());
        let description = (rest.split_whitespace().count() > 1).then(|| rest.to_string());
        Ok(Command::AddExpense(NewExpense {
            amount: parse_amount(amount)?,
            category: Some(category.to_lowercase()),
            date: self.today,
            description,
            source: ExpenseSource::Chat,
        }))
    }

    /// `add <amount> [category] [date] [description...]`
    fn add(&self, args: &[&str]) -> Result<Command> {
        let amount = parse_amount(args.first().copied().unwrap_or_default())?;
        let category = args.get(1).map(|c| c.to_string());

        let mut rest = args.iter().skip(2).peekable();
        let date = match rest.peek().map(|w| **w) {
            Some(word) => match parse_date(word, self.today) {
                Ok(date) => {
                    rest.next();
                    date
                }
                Err(err) if looks_like_date(word) => return Err(err),
                Err(_) => self.today,
            },
            None => self.today,
        };
        let description: Vec<&str> = rest.copied().collect();

        Ok(Command::AddExpense(NewExpense {
            amount,
            category,
            date,
            description: (!description.is_empty()).then(|| description.join(" ")),
            source: ExpenseSource::Chat,
        }))
    }

    /// `list [range] [category]`
    fn list(&self, args: &[&str]) -> Result<Command> {
        let (range, rest) = self.leading_range(args)?;
        Ok(Command::ListExpenses(ExpenseFilter {
            range,
            category: rest.first().map(|c| c.to_string()),
            ..Default::default()
        }))
    }

    fn budget(&self, args: &[&str]) -> Result<Command> {
        let current = Period::containing(self.today);
        match args.first().map(|a| a.to_lowercase()).as_deref() {
            None => Ok(Command::ListBudgets {
                period: Some(current),
            }),
            Some("all") => Ok(Command::ListBudgets { period: None }),
            Some(action @ ("set" | "update")) => {
                let category = args
                    .get(1)
                    .ok_or_else(|| Error::validation("category", "missing"))?;
                let limit = args
                    .get(2)
                    .ok_or_else(|| Error::validation("limit", "missing"))
                    .and_then(|l| parse_amount(l))
                    .map_err(|e| rename_field(e, "limit"))?;
                let period = args.get(3).map(|p| parse_period(p)).transpose()?;
                Ok(Command::SetBudget {
                    category: category.to_string(),
                    period: period.unwrap_or(current),
                    limit,
                    replace: action == "update",
                })
            }
            Some("delete") => {
                let category = args
                    .get(1)
                    .ok_or_else(|| Error::validation("category", "missing"))?;
                let period = args.get(2).map(|p| parse_period(p)).transpose()?;
                Ok(Command::DeleteBudget {
                    category: category.to_string(),
                    period: period.unwrap_or(current),
                })
            }
            Some(_) => Ok(Command::ListBudgets {
                period: Some(parse_period(args[0])?),
            }),
        }
    }

    fn report(&self, args: &[&str], kind: ReportKind, default: DateRange) -> Result<Command> {
        let (range, rest) = self.leading_range(args)?;
        Ok(Command::GetReport(ReportRequest {
            range: range.unwrap_or(default),
            category: rest.first().map(|c| c.to_string()),
            kind,
        }))
    }

    /// `patterns [days]`
    fn patterns(&self, args: &[&str]) -> Result<Command> {
        let days = match args.first() {
            Some(days) => days
                .parse::<i64>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| Error::validation("days", format!("not a day count: '{}'", days)))?,
            None => PATTERN_DAYS,
        };
        Ok(Command::GetReport(ReportRequest {
            range: DateRange::last_days(days, self.today),
            category: None,
            kind: ReportKind::Daily,
        }))
    }

    /// `compare [current] [previous]`, defaulting to this month against last
    fn compare(&self, args: &[&str]) -> Result<Command> {
        let current = match args.first() {
            Some(r) => DateRange::parse(r, self.today)?,
            None => DateRange::this_month(self.today),
        };
        let previous = match args.get(1) {
            Some(r) => DateRange::parse(r, self.today)?,
            None => DateRange::parse("last-month", self.today)?,
        };
        Ok(Command::GetReport(ReportRequest {
            range: current,
            category: args.get(2).map(|c| c.to_string()),
            kind: ReportKind::Compare { previous },
        }))
    }

    fn category(&self, args: &[&str]) -> Result<Command> {
        let name = || {
            args.get(1)
                .map(|n| n.to_string())
                .ok_or_else(|| Error::validation("category", "missing"))
        };
        match args.first().map(|a| a.to_lowercase()).as_deref() {
            None | Some("list") => Ok(Command::ListCategories),
            Some("add") => Ok(Command::AddCategory {
                name: name()?,
                parent: args.get(2).map(|p| p.to_string()),
            }),
            Some("delete") => Ok(Command::DeleteCategory {
                name: name()?,
                reassign_to: args.get(2).map(|t| t.to_string()),
            }),
            Some(other) => Err(Error::UnknownCommand(format!("category {}", other))),
        }
    }

    /// `edit <id> key=value...`
    fn edit(&self, args: &[&str]) -> Result<Command> {
        let id = parse_id(args.first().ok_or_else(|| Error::validation("id", "missing"))?)?;
        let mut changes = ExpenseChanges::default();
        let mut description: Vec<&str> = Vec::new();

        for arg in args.iter().skip(1) {
            match arg.split_once('=') {
                Some((key, value)) => match key.to_lowercase().as_str() {
                    "amount" => changes.amount = Some(parse_amount(value)?),
                    "category" => changes.category = Some(value.to_string()),
                    "date" => changes.date = Some(parse_date(value, self.today)?),
                    "description" | "desc" | "note" => {
                        description.clear();
                        description.push(value);
                    }
                    other => {
                        return Err(Error::validation(
                            "edit",
                            format!(
                                "unknown field '{}' (use amount, category, date or description)",
                                other
                            ),
                        ))
                    }
                },
                // Words after description= continue the description
                None if !description.is_empty() => description.push(arg),
                None => {
                    return Err(Error::validation(
                        "edit",
                        format!("expected key=value, got '{}'", arg),
                    ))
                }
            }
        }
        if !description.is_empty() {
            changes.description = Some(description.join(" "));
        }

        Ok(Command::EditExpense { id, changes })
    }

    /// Split off a leading range argument if the first word is one
    fn leading_range<'a>(&self, args: &'a [&'a str]) -> Result<(Option<DateRange>, &'a [&'a str])> {
        match args.first() {
            Some(first) => match DateRange::parse(first, self.today) {
                Ok(range) => Ok((Some(range), &args[1..])),
                Err(err) if looks_like_date(first) => Err(err),
                Err(_) => Ok((None, args)),
            },
            None => Ok((None, args)),
        }
    }
}

/// Starts with a digit, so it was meant as a date or range rather than a name
fn looks_like_date(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn rename_field(err: Error, field: &str) -> Error {
    match err {
        Error::Validation { message, .. } => Error::validation(field, message),
        other => other,
    }
}

/// Chat front end: parse, dispatch, render
#[derive(Clone)]
pub struct ChatBot {
    dispatcher: Dispatcher,
    formatter: ReportFormatter,
}

impl ChatBot {
    pub fn new(dispatcher: Dispatcher, formatter: ReportFormatter) -> Self {
        Self {
            dispatcher,
            formatter,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one message and produce the reply text. Never fails: errors
    /// become user-visible replies.
    pub fn reply(&self, owner: &str, text: &str, today: NaiveDate) -> String {
        match self.handle(owner, text, today) {
            Ok(outcome) => self.formatter.render(&outcome),
            Err(err) => {
                debug!(owner, error = %err, "Chat command failed");
                self.formatter.render_error(&err)
            }
        }
    }

    fn handle(&self, owner: &str, text: &str, today: NaiveDate) -> Result<Outcome> {
        let command = ChatParser::new(today).parse(text)?;
        self.dispatcher.dispatch(owner, command)
    }
}
