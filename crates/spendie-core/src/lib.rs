//! Spendie Core Library
//!
//! Shared functionality for the Spendie expense tracker:
//! - Record store (SQLite) with per-owner write serialization
//! - Aggregation of spending by category, month and day
//! - Budget monitor with once-per-threshold alerts
//! - Report formatting and CSV export/import
//! - Command dispatcher shared by the CLI, the JSON API and the chat bot

pub mod aggregate;
pub mod chat;
pub mod command;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod input;
pub mod models;
pub mod monitor;
pub mod period;
pub mod report;

pub use chat::{ChatBot, ChatParser};
pub use command::{Command, Outcome, Report, ReportKind, ReportRequest};
pub use config::Config;
pub use db::Database;
pub use dispatch::Dispatcher;
pub use error::{Error, ErrorKind, Result};
pub use monitor::BudgetMonitor;
pub use period::{DateRange, Period};
pub use report::ReportFormatter;
