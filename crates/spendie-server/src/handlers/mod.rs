//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod chat;
pub mod commands;
pub mod export;
pub mod health;

// Re-export all handlers for use in router
pub use chat::*;
pub use commands::*;
pub use export::*;
pub use health::*;
