//! TaskBuddy Telegram Bot
//!
//! A Telegram bot for personal task management. Users register an account,
//! log in and create, list, complete, edit and delete tasks with start/end
//! times, getting reminders before a task starts and when it is overdue.
//! Every multi-step interaction is driven by a persistent per-user
//! conversation state kept in the [`state::ContextStore`].

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{TaskBuddyError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;
pub use state::{ContextStore, MemoryStateBackend, StateBackend, Step};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
