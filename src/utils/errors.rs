//! Error handling for TaskBuddy
//!
//! This module defines the main error type used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for TaskBuddy application
#[derive(Error, Debug)]
pub enum TaskBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Account not found: {owner_telegram_id}")]
    AccountNotFound { owner_telegram_id: i64 },

    #[error("Task not found: {id_task}")]
    TaskNotFound { id_task: i32 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for TaskBuddy operations
pub type Result<T> = std::result::Result<T, TaskBuddyError>;

impl TaskBuddyError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            TaskBuddyError::Database(_) => false,
            TaskBuddyError::Migration(_) => false,
            TaskBuddyError::Telegram(_) => true,
            TaskBuddyError::ConfigLoad(_) => false,
            TaskBuddyError::Config(_) => false,
            TaskBuddyError::Serialization(_) => false,
            TaskBuddyError::Io(_) => true,
            TaskBuddyError::AccountNotFound { .. } => false,
            TaskBuddyError::TaskNotFound { .. } => false,
            TaskBuddyError::PermissionDenied(_) => false,
            TaskBuddyError::Authentication(_) => false,
            TaskBuddyError::InvalidInput(_) => false,
            TaskBuddyError::InvalidStateTransition { .. } => false,
            TaskBuddyError::PasswordHash(_) => false,
            TaskBuddyError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TaskBuddyError::Database(_) => ErrorSeverity::Critical,
            TaskBuddyError::Migration(_) => ErrorSeverity::Critical,
            TaskBuddyError::ConfigLoad(_) => ErrorSeverity::Critical,
            TaskBuddyError::Config(_) => ErrorSeverity::Critical,
            TaskBuddyError::PermissionDenied(_) => ErrorSeverity::Warning,
            TaskBuddyError::Authentication(_) => ErrorSeverity::Warning,
            TaskBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Whether the message is safe to show to the end user as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            TaskBuddyError::PermissionDenied(_)
                | TaskBuddyError::Authentication(_)
                | TaskBuddyError::InvalidInput(_)
                | TaskBuddyError::AccountNotFound { .. }
                | TaskBuddyError::TaskNotFound { .. }
        )
    }

    /// Text to show the end user for this error
    pub fn user_message(&self) -> String {
        match self {
            TaskBuddyError::InvalidInput(msg)
            | TaskBuddyError::Authentication(msg)
            | TaskBuddyError::PermissionDenied(msg) => msg.clone(),
            TaskBuddyError::AccountNotFound { .. } => "No account is linked to you yet".to_string(),
            TaskBuddyError::TaskNotFound { id_task } => format!("Task #{} was not found", id_task),
            TaskBuddyError::InvalidStateTransition { .. } => "This button is no longer active".to_string(),
            _ => "Something went wrong, please try again later".to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
