//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod account;
pub mod state;
pub mod task;

// Re-export commonly used models
pub use account::{Account, CreateAccountRequest};
pub use state::{ConversationState, ConversationStateRow, StateData};
pub use task::{Task, CreateTaskRequest, TaskFilter, TaskStatus, TaskField};
