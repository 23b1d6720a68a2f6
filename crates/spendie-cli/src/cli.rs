//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendie - Track expenses and stay inside your budgets
#[derive(Parser)]
#[command(name = "spendie")]
#[command(about = "Personal expense tracker with monthly budgets and alerts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (overrides the config file and SPENDIE_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to SPENDIE_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Whose expenses to work with
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Record an expense
    Add {
        /// Amount, e.g. 250, 1,200.50 or ₹99
        amount: String,

        /// Category (defaults to the configured default category)
        #[arg(short, long)]
        category: Option<String>,

        /// Date: YYYY-MM-DD, today or yesterday
        #[arg(short, long, default_value = "today")]
        date: String,

        /// Free-text note
        #[arg(short = 'm', long)]
        description: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Range: this-month, last-7-days, 2024-03, FROM..TO, ...
        #[arg(short, long)]
        period: Option<String>,

        /// Match against the description
        #[arg(short, long)]
        search: Option<String>,

        /// Smallest amount to include
        #[arg(long)]
        min: Option<String>,

        /// Largest amount to include
        #[arg(long)]
        max: Option<String>,

        /// Maximum number of expenses to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Change fields of an existing expense
    Edit {
        /// Expense ID
        id: i64,

        #[arg(short, long)]
        amount: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        date: Option<String>,

        /// New note (pass an empty string to clear it)
        #[arg(short = 'm', long)]
        description: Option<String>,
    },

    /// Delete one expense
    Delete {
        /// Expense ID
        id: i64,
    },

    /// Delete every expense (budgets and categories are kept)
    DeleteAll {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage monthly budgets
    Budget {
        #[command(subcommand)]
        action: Option<BudgetAction>,
    },

    /// Generate spending reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Show budget alerts that have fired
    Alerts {
        /// Budget period (YYYY-MM)
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Export expenses as CSV
    Export {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Range to export (everything if not specified)
        #[arg(short, long)]
        period: Option<String>,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Import expenses from a CSV file (all rows or none)
    Import {
        /// CSV file with date,category,amount,description columns
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Talk to the chat bot from the terminal
    Chat,

    /// Start the web server (chat webhook and command API)
    Serve {
        /// Port to listen on (defaults to the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the config file)
        #[arg(long)]
        host: Option<String>,

        /// Disable the owner header requirement (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// Without it, API calls must name their owner in the x-spendie-owner header.
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Set a budget for a category and month
    Set {
        /// Category name
        category: String,

        /// Monthly limit
        limit: String,

        /// Budget period (YYYY-MM, defaults to this month)
        #[arg(short, long)]
        period: Option<String>,

        /// Replace an existing budget for the same category and month
        #[arg(long)]
        replace: bool,
    },

    /// Change the limit of an existing budget
    Update {
        category: String,

        limit: String,

        #[arg(short, long)]
        period: Option<String>,
    },

    /// Show budgets with spending against them
    List {
        /// Budget period (YYYY-MM, defaults to this month)
        #[arg(short, long)]
        period: Option<String>,

        /// Show every period
        #[arg(short, long)]
        all: bool,
    },

    /// Remove a budget
    Delete {
        category: String,

        #[arg(short, long)]
        period: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Total spending with a per-category breakdown
    Summary {
        /// Range: this-month, last-month, this-year, 2024-03, FROM..TO, ...
        #[arg(short, long, default_value = "this-month")]
        period: String,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Count child categories under their parent
        #[arg(long)]
        rollup: bool,
    },

    /// Totals per category and month
    Periods {
        #[arg(short, long, default_value = "this-month")]
        period: String,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Monthly spending over time
    Trends {
        #[arg(short, long, default_value = "last-12-months")]
        period: String,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Day-by-day spending for recent days
    Daily {
        /// Number of days ending today
        #[arg(short, long, default_value = "7")]
        days: i64,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Compare two ranges
    Compare {
        #[arg(long, default_value = "this-month")]
        current: String,

        #[arg(long, default_value = "last-month")]
        previous: String,

        #[arg(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories with expense counts
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,

        /// Parent category
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Delete a category
    Delete {
        /// Category name
        name: String,

        /// Move its expenses to this category first
        #[arg(long)]
        reassign_to: Option<String>,
    },
}
