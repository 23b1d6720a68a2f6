//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `App` - Dispatcher, formatter and owner shared by every command
//! - `open_db` / `open_app` - Shared utilities to open the database
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use spendie_core::{Command, Config, Database, Dispatcher, Outcome, ReportFormatter};

/// Everything a command needs to talk to the store
pub struct App {
    pub dispatcher: Dispatcher,
    pub formatter: ReportFormatter,
    pub owner: String,
    pub today: NaiveDate,
}

impl App {
    pub fn new(db: Database, config: &Config, today: NaiveDate) -> Self {
        Self {
            dispatcher: Dispatcher::new(db, config),
            formatter: ReportFormatter::new(&config.currency),
            owner: config.owner.clone(),
            today,
        }
    }

    pub fn db(&self) -> &Database {
        self.dispatcher.database()
    }

    /// Dispatch without printing
    pub fn execute(&self, command: Command) -> Result<Outcome> {
        Ok(self.dispatcher.dispatch(&self.owner, command)?)
    }

    /// Dispatch and print the rendered outcome
    pub fn run(&self, command: Command) -> Result<Outcome> {
        let outcome = self.execute(command)?;
        println!("{}", self.formatter.render(&outcome));
        Ok(outcome)
    }
}

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

/// Open the configured database for today's date
pub fn open_app(config: &Config) -> Result<App> {
    let db = open_db(&config.database)?;
    Ok(App::new(db, config, Local::now().date_naive()))
}

pub fn cmd_init(config: &Config) -> Result<()> {
    println!("🔧 Initializing database at {}...", config.database.display());

    let db = open_db(&config.database)?;
    let count = db.count_expenses(&config.owner)?;

    println!("   Owner: {}", config.owner);
    println!("   Expenses on record: {}", count);
    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record an expense: spendie add 250 --category food");
    println!("  2. Set a budget: spendie budget set food 5000");
    println!("  3. Start the chat webhook: spendie serve");

    Ok(())
}
