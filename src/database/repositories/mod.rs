//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod account;
pub mod state;
pub mod task;

// Re-export repositories
pub use account::AccountRepository;
pub use state::StateRepository;
pub use task::TaskRepository;
