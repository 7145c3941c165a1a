//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{TaskBuddyError, Result};
use crate::utils::helpers::offset_from_minutes;
use super::Settings;

/// Longest reminder lead time: one week
pub const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;

/// Longest pause between reminder passes: one day
pub const MAX_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_logging_config(&settings.logging)?;
    validate_reminder_config(&settings.reminders)?;
    validate_task_config(&settings.tasks)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(TaskBuddyError::Config(
            "Bot token is required".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TaskBuddyError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(TaskBuddyError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(TaskBuddyError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.acquire_timeout_seconds == 0 {
        return Err(TaskBuddyError::Config(
            "Acquire timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(TaskBuddyError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(TaskBuddyError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    if config.file_path.is_empty() {
        return Err(TaskBuddyError::Config(
            "Log file path is required".to_string()
        ));
    }

    Ok(())
}

/// Validate reminder configuration
fn validate_reminder_config(config: &super::ReminderConfig) -> Result<()> {
    if config.interval_seconds == 0 {
        return Err(TaskBuddyError::Config(
            "Reminder interval must be greater than 0".to_string()
        ));
    }

    if config.interval_seconds > MAX_INTERVAL_SECONDS {
        return Err(TaskBuddyError::Config(
            format!("Reminder interval cannot exceed {} seconds", MAX_INTERVAL_SECONDS)
        ));
    }

    if config.lead_minutes < 0 {
        return Err(TaskBuddyError::Config(
            "Reminder lead time cannot be negative".to_string()
        ));
    }

    if config.lead_minutes > MAX_LEAD_MINUTES {
        return Err(TaskBuddyError::Config(
            format!("Reminder lead time cannot exceed {} minutes", MAX_LEAD_MINUTES)
        ));
    }

    Ok(())
}

/// Validate task input configuration
fn validate_task_config(config: &super::TaskConfig) -> Result<()> {
    if offset_from_minutes(config.utc_offset_minutes).is_none() {
        return Err(TaskBuddyError::Config(
            format!("UTC offset out of range: {} minutes", config.utc_offset_minutes)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bot.token = "12345:token".to_string();
        settings
    }

    #[test]
    fn test_valid_settings() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token() {
        let settings = Settings::default();
        assert_matches!(validate_settings(&settings), Err(TaskBuddyError::Config(_)));
    }

    #[test]
    fn test_pool_sizes() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());

        settings.database.min_connections = 0;
        settings.database.max_connections = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_reminders_and_offset() {
        let mut settings = valid_settings();
        settings.reminders.interval_seconds = 0;
        assert!(validate_settings(&settings).is_err());

        let mut settings = valid_settings();
        settings.tasks.utc_offset_minutes = 25 * 60;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_reminder_bounds() {
        let mut settings = valid_settings();
        settings.reminders.lead_minutes = MAX_LEAD_MINUTES;
        assert!(validate_settings(&settings).is_ok());

        settings.reminders.lead_minutes = MAX_LEAD_MINUTES + 1;
        assert_matches!(validate_settings(&settings), Err(TaskBuddyError::Config(_)));

        settings.reminders.lead_minutes = i64::MAX;
        assert_matches!(validate_settings(&settings), Err(TaskBuddyError::Config(_)));

        let mut settings = valid_settings();
        settings.reminders.interval_seconds = u64::MAX;
        assert_matches!(validate_settings(&settings), Err(TaskBuddyError::Config(_)));
    }
}
