//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod reminder;
pub mod task;

// Re-export commonly used services
pub use auth::AccountService;
pub use reminder::{Delivery, ReminderScheduler, ReminderKind, ReminderStats, SendAttempts};
pub use task::TaskService;

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::{TaskBuddyError, Result};
use crate::utils::helpers::offset_from_minutes;

/// Service factory for creating and managing all services
#[derive(Clone, Debug)]
pub struct ServiceFactory {
    pub account_service: AccountService,
    pub task_service: TaskService,
    pub database: DatabaseService,
    pub settings: Settings,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: Settings, database: DatabaseService) -> Result<Self> {
        let offset = offset_from_minutes(settings.tasks.utc_offset_minutes).ok_or_else(|| {
            TaskBuddyError::Config(format!(
                "Invalid UTC offset: {} minutes",
                settings.tasks.utc_offset_minutes
            ))
        })?;

        Ok(Self {
            account_service: AccountService::new(database.accounts.clone()),
            task_service: TaskService::new(database.tasks.clone(), offset),
            database,
            settings,
        })
    }

    /// Build the reminder scheduler for this configuration
    pub fn reminder_scheduler(&self, bot: teloxide::Bot) -> ReminderScheduler {
        ReminderScheduler::new(
            bot,
            self.database.tasks.clone(),
            self.settings.reminders.clone(),
            self.task_service.offset(),
        )
    }
}
