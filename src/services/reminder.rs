//! Task reminder scheduler
//!
//! A background task that periodically notifies owners about tasks that are
//! about to start and tasks that ended without being completed. Every notice
//! is sent once: the task row records that it went out. A notice the owner
//! can never receive, or one that kept failing, is recorded the same way.

use std::collections::HashMap;
use std::time::Duration;
use chrono::{DateTime, FixedOffset, Utc};
use teloxide::{ApiError, Bot, RequestError, requests::Requester, types::ChatId};
use uuid::Uuid;
use tracing::{info, warn, error, debug};
use crate::config::ReminderConfig;
use crate::database::repositories::TaskRepository;
use crate::models::Task;
use crate::utils::errors::Result;
use crate::utils::helpers::format_task_time;

/// Sends of one notice that may fail before it is given up
pub const MAX_SEND_ATTEMPTS: u32 = 5;

/// Kind of notice sent for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderKind {
    StartsSoon,
    Overdue,
}

/// Text of a reminder message
pub fn reminder_text(kind: ReminderKind, task: &Task, offset: FixedOffset, now: DateTime<Utc>) -> String {
    match kind {
        ReminderKind::StartsSoon => {
            let minutes = (task.start_time - now).num_minutes().max(0);
            format!(
                "Reminder: task #{} \"{}\" starts in {} min ({}).",
                task.id_task,
                task.task_name,
                minutes,
                format_task_time(task.start_time, offset)
            )
        }
        ReminderKind::Overdue => format!(
            "Task #{} \"{}\" is overdue: it was due {} and is not marked as completed.",
            task.id_task,
            task.task_name,
            format_task_time(task.end_time, offset)
        ),
    }
}

/// What a send result means for the notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The owner can never receive it: the bot is blocked or the chat is gone
    Undeliverable,
    /// Try again on the next pass
    Retry,
}

impl Delivery {
    pub fn of<T>(result: &std::result::Result<T, RequestError>) -> Self {
        match result {
            Ok(_) => Delivery::Sent,
            Err(RequestError::Api(
                ApiError::BotBlocked
                | ApiError::BotKicked
                | ApiError::ChatNotFound
                | ApiError::UserDeactivated
                | ApiError::CantInitiateConversation,
            )) => Delivery::Undeliverable,
            Err(_) => Delivery::Retry,
        }
    }
}

/// Failed sends per notice, kept between passes
#[derive(Debug, Default)]
pub struct SendAttempts {
    failures: HashMap<(Uuid, ReminderKind), u32>,
}

impl SendAttempts {
    /// Record a failed send; `true` once the notice has used up its attempts
    pub fn record_failure(&mut self, task_uuid: Uuid, kind: ReminderKind) -> bool {
        let failures = self.failures.entry((task_uuid, kind)).or_insert(0);
        *failures += 1;
        *failures >= MAX_SEND_ATTEMPTS
    }

    pub fn forget(&mut self, task_uuid: Uuid, kind: ReminderKind) {
        self.failures.remove(&(task_uuid, kind));
    }

    pub fn pending(&self) -> usize {
        self.failures.len()
    }
}

/// Outcome of one scheduler pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderStats {
    pub sent: usize,
    pub failed: usize,
    /// Notices recorded as sent without reaching the owner
    pub dropped: usize,
}

/// Background reminder manager
pub struct ReminderScheduler {
    bot: Bot,
    tasks: TaskRepository,
    config: ReminderConfig,
    offset: FixedOffset,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(bot: Bot, tasks: TaskRepository, config: ReminderConfig, offset: FixedOffset) -> Self {
        Self {
            bot,
            tasks,
            config,
            offset,
            handle: None,
        }
    }

    /// Start the periodic reminder task
    pub fn start(&mut self) {
        if !self.config.enabled {
            info!("Task reminders are disabled");
            return;
        }
        if self.handle.is_some() {
            warn!("Reminder task is already running");
            return;
        }

        let Some(lead) = chrono::Duration::try_minutes(self.config.lead_minutes) else {
            error!(lead_minutes = self.config.lead_minutes, "Reminder lead time is out of range");
            return;
        };
        let mut worker = ReminderWorker {
            bot: self.bot.clone(),
            tasks: self.tasks.clone(),
            lead,
            offset: self.offset,
            attempts: SendAttempts::default(),
        };
        let period = Duration::from_secs(self.config.interval_seconds);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                match worker.run_once(Utc::now()).await {
                    Ok(stats) => {
                        if stats != ReminderStats::default() {
                            info!(
                                sent = stats.sent,
                                failed = stats.failed,
                                dropped = stats.dropped,
                                "Reminder pass finished"
                            );
                        }
                    }
                    Err(e) => {
                        error!("Reminder pass failed: {}", e);
                    }
                }
            }
        });

        self.handle = Some(handle);
        info!("Started reminder task with interval {:?}", period);
    }

    /// Stop the periodic reminder task
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Stopped reminder task");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct ReminderWorker {
    bot: Bot,
    tasks: TaskRepository,
    lead: chrono::Duration,
    offset: FixedOffset,
    attempts: SendAttempts,
}

impl ReminderWorker {
    async fn run_once(&mut self, now: DateTime<Utc>) -> Result<ReminderStats> {
        let mut stats = ReminderStats::default();

        for task in self.tasks.due_start_reminders(now, now + self.lead).await? {
            self.deliver(ReminderKind::StartsSoon, &task, now, &mut stats).await;
        }

        for task in self.tasks.due_overdue_notices(now).await? {
            self.deliver(ReminderKind::Overdue, &task, now, &mut stats).await;
        }

        Ok(stats)
    }

    async fn deliver(&mut self, kind: ReminderKind, task: &Task, now: DateTime<Utc>, stats: &mut ReminderStats) {
        let text = reminder_text(kind, task, self.offset, now);
        let result = self.bot.send_message(ChatId(task.owner_telegram_id), text).await;

        let done = match Delivery::of(&result) {
            Delivery::Sent => {
                debug!(owner_telegram_id = task.owner_telegram_id, id_task = task.id_task, kind = ?kind, "Reminder sent");
                stats.sent += 1;
                true
            }
            Delivery::Undeliverable => {
                warn!(owner_telegram_id = task.owner_telegram_id, id_task = task.id_task, kind = ?kind, "Owner cannot receive reminders, dropping notice");
                stats.dropped += 1;
                true
            }
            Delivery::Retry => {
                stats.failed += 1;
                let exhausted = self.attempts.record_failure(task.task_uuid, kind);
                if let Err(e) = &result {
                    warn!(owner_telegram_id = task.owner_telegram_id, id_task = task.id_task, error = %e, "Failed to send reminder");
                }
                if exhausted {
                    warn!(id_task = task.id_task, kind = ?kind, attempts = MAX_SEND_ATTEMPTS, "Giving up on reminder");
                    stats.dropped += 1;
                }
                exhausted
            }
        };

        if !done {
            return;
        }
        self.attempts.forget(task.task_uuid, kind);

        let marked = match kind {
            ReminderKind::StartsSoon => self.tasks.mark_start_reminded(task.task_uuid).await,
            ReminderKind::Overdue => self.tasks.mark_end_reminded(task.task_uuid).await,
        };
        if let Err(e) = marked {
            error!(id_task = task.id_task, kind = ?kind, error = %e, "Failed to record reminder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::helpers::offset_from_minutes;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn task() -> Task {
        let start = Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap();
        Task {
            task_uuid: Uuid::new_v4(),
            id_task: 3,
            owner_telegram_id: 1,
            task_name: "Standup".to_string(),
            description: String::new(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(15),
            completion_time: None,
            status: false,
            start_reminded: false,
            end_reminded: false,
        }
    }

    #[test]
    fn test_reminder_text() {
        let offset = offset_from_minutes(0).unwrap();
        let task = task();

        let soon = reminder_text(ReminderKind::StartsSoon, &task, offset, task.start_time - chrono::Duration::minutes(10));
        assert_eq!(soon, "Reminder: task #3 \"Standup\" starts in 10 min (05.03.2025 10:00 (UTC+00:00)).");

        let overdue = reminder_text(ReminderKind::Overdue, &task, offset, task.end_time + chrono::Duration::hours(1));
        assert!(overdue.starts_with("Task #3 \"Standup\" is overdue"));
        assert!(overdue.contains("05.03.2025 10:15"));
    }

    #[test]
    fn test_delivery_classification() {
        let sent: std::result::Result<(), RequestError> = Ok(());
        assert_eq!(Delivery::of(&sent), Delivery::Sent);

        for error in [ApiError::BotBlocked, ApiError::ChatNotFound, ApiError::UserDeactivated] {
            let result: std::result::Result<(), _> = Err(RequestError::Api(error));
            assert_eq!(Delivery::of(&result), Delivery::Undeliverable);
        }

        let flaky: std::result::Result<(), _> = Err(RequestError::Api(ApiError::Unknown("Bad Gateway".to_string())));
        assert_eq!(Delivery::of(&flaky), Delivery::Retry);
    }

    #[test]
    fn test_send_attempts_are_capped() {
        let mut attempts = SendAttempts::default();
        let id = Uuid::new_v4();

        for _ in 1..MAX_SEND_ATTEMPTS {
            assert!(!attempts.record_failure(id, ReminderKind::StartsSoon));
        }
        // The other notice of the same task counts separately
        assert!(!attempts.record_failure(id, ReminderKind::Overdue));
        assert!(attempts.record_failure(id, ReminderKind::StartsSoon));

        attempts.forget(id, ReminderKind::StartsSoon);
        assert_eq!(attempts.pending(), 1);
        assert!(!attempts.record_failure(id, ReminderKind::StartsSoon));
    }

    #[test]
    fn test_reminder_text_never_negative() {
        let offset = offset_from_minutes(0).unwrap();
        let task = task();
        let late = reminder_text(ReminderKind::StartsSoon, &task, offset, task.start_time + chrono::Duration::minutes(1));
        assert!(late.contains("starts in 0 min"));
    }
}
