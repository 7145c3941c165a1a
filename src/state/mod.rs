//! State management module
//!
//! This module handles per-user conversation state: the current step and the
//! scratch data of the flow the user is in.

pub mod backend;
pub mod steps;
pub mod store;

// Re-export commonly used state components
pub use backend::{MemoryStateBackend, StateBackend};
pub use steps::Step;
pub use store::ContextStore;
