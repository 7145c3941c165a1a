//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

/// Reminder scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    /// How long before a task starts the reminder is sent
    pub lead_minutes: i64,
}

/// Task input configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskConfig {
    /// Offset east of UTC applied to dates typed by users
    pub utc_offset_minutes: i32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: "logs/taskbuddy.log".to_string(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
            lead_minutes: 15,
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: 0 }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from configuration file and environment variables
    ///
    /// Environment variables use the `TASKBUDDY` prefix and `__` as the section
    /// separator, e.g. `TASKBUDDY__BOT__TOKEN`.
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("TASKBUDDY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load settings from an explicit TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::TaskBuddyError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/taskbuddy".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                acquire_timeout_seconds: default_acquire_timeout(),
            },
            logging: LoggingConfig::default(),
            reminders: ReminderConfig::default(),
            tasks: TaskConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [bot]
            token = "12345:abc"

            [database]
            url = "postgresql://localhost/taskbuddy_test"

            [tasks]
            utc_offset_minutes = 180
            "#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.bot.token, "12345:abc");
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.database.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(settings.logging.level, "info");
        assert!(settings.reminders.enabled);
        assert_eq!(settings.tasks.utc_offset_minutes, 180);
    }

    #[test]
    fn test_from_file_missing_section() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[bot]\ntoken = \"x\"").unwrap();

        assert!(Settings::from_file(file.path()).is_err());
    }
}
