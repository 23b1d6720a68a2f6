//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared app handle (open_app) and init
//! - `expenses` - Add, list, edit and delete expenses
//! - `budgets` - Budget management and alert history
//! - `reports` - Report generation commands
//! - `export` - CSV export and import
//! - `categories` - Category management
//! - `chat` - Terminal chat session with the bot
//! - `serve` - Web server command

pub mod budgets;
pub mod categories;
pub mod chat;
pub mod core;
pub mod export;
pub mod expenses;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use budgets::*;
pub use categories::*;
pub use chat::*;
pub use core::*;
pub use export::*;
pub use expenses::*;
pub use reports::*;
pub use serve::*;
