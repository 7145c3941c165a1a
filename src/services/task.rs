//! Task service implementation
//!
//! Task creation, listing and editing, plus parsing of the `DD.MM.YYYY HH:MM`
//! times users type in.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{info, debug};
use crate::database::repositories::TaskRepository;
use crate::models::task::{Task, CreateTaskRequest, TaskFilter, TaskStatus};
use crate::utils::errors::{TaskBuddyError, Result};
use crate::utils::helpers::{format_task_time, non_blank, TASK_TIME_FORMAT};

pub const TASK_NAME_MAX_LENGTH: usize = 128;
pub const TASK_DESCRIPTION_MAX_LENGTH: usize = 1024;

/// Parse a time typed as `DD.MM.YYYY HH:MM` in the given offset.
///
/// Only years 2000 to 2099 are accepted.
pub fn parse_task_time(input: &str, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let invalid = || {
        TaskBuddyError::InvalidInput(format!(
            "Invalid date '{}', expected DD.MM.YYYY HH:MM",
            input.trim()
        ))
    };

    let input = input.trim();
    // chrono accepts unpadded fields; the stored format is always zero padded
    if input.len() != "DD.MM.YYYY HH:MM".len() {
        return Err(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(input, TASK_TIME_FORMAT).map_err(|_| invalid())?;
    if !(2000..=2099).contains(&naive.year()) {
        return Err(invalid());
    }

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// A task must end strictly after it starts
pub fn validate_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(TaskBuddyError::InvalidInput(
            "The end of a task must be later than its start".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_task_name(name: &str) -> Result<&str> {
    let name = non_blank(name)
        .ok_or_else(|| TaskBuddyError::InvalidInput("Task name must not be empty".to_string()))?;
    if name.chars().count() > TASK_NAME_MAX_LENGTH {
        return Err(TaskBuddyError::InvalidInput(format!(
            "Task name must be at most {} characters",
            TASK_NAME_MAX_LENGTH
        )));
    }
    Ok(name)
}

pub fn validate_description(description: &str) -> Result<&str> {
    let description = description.trim();
    if description.chars().count() > TASK_DESCRIPTION_MAX_LENGTH {
        return Err(TaskBuddyError::InvalidInput(format!(
            "Description must be at most {} characters",
            TASK_DESCRIPTION_MAX_LENGTH
        )));
    }
    Ok(description)
}

/// Render a task card
pub fn format_task(task: &Task, offset: FixedOffset, now: DateTime<Utc>) -> String {
    let mut text = format!(
        "Task #{}: {}\n\n\
         Description:\n{}\n\n\
         Start: {}\n\
         End: {}\n\
         Status: {}",
        task.id_task,
        task.task_name,
        if task.description.is_empty() { "-" } else { task.description.as_str() },
        format_task_time(task.start_time, offset),
        format_task_time(task.end_time, offset),
        TaskStatus::of(task, now).label(),
    );
    if let Some(completed) = task.completion_time {
        text.push_str(&format!("\nCompleted: {}", format_task_time(completed, offset)));
    }
    text
}

/// Task service for managing a user's tasks
#[derive(Clone, Debug)]
pub struct TaskService {
    tasks: TaskRepository,
    offset: FixedOffset,
}

impl TaskService {
    /// Create a new TaskService; user input is read in `offset`
    pub fn new(tasks: TaskRepository, offset: FixedOffset) -> Self {
        Self { tasks, offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn parse_time(&self, input: &str) -> Result<DateTime<Utc>> {
        parse_task_time(input, self.offset)
    }

    pub fn format(&self, task: &Task) -> String {
        format_task(task, self.offset, Utc::now())
    }

    pub async fn create(
        &self,
        owner_telegram_id: i64,
        name: &str,
        description: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Task> {
        let name = validate_task_name(name)?;
        let description = validate_description(description)?;
        validate_period(start_time, end_time)?;

        let task = self
            .tasks
            .create(CreateTaskRequest {
                owner_telegram_id,
                task_name: name.to_string(),
                description: description.to_string(),
                start_time,
                end_time,
            })
            .await?;

        info!(owner_telegram_id = owner_telegram_id, id_task = task.id_task, "Task created");
        Ok(task)
    }

    pub async fn list(&self, owner_telegram_id: i64, filter: TaskFilter) -> Result<Vec<Task>> {
        debug!(owner_telegram_id = owner_telegram_id, filter = filter.as_str(), "Listing tasks");
        self.tasks.list(owner_telegram_id, filter, Utc::now()).await
    }

    pub async fn find(&self, owner_telegram_id: i64, id_task: i32) -> Result<Option<Task>> {
        self.tasks.find(owner_telegram_id, id_task).await
    }

    /// Find a task or fail with `TaskNotFound`
    pub async fn get(&self, owner_telegram_id: i64, id_task: i32) -> Result<Task> {
        self.find(owner_telegram_id, id_task)
            .await?
            .ok_or(TaskBuddyError::TaskNotFound { id_task })
    }

    /// Mark a task done or not done; returns the new completion status
    pub async fn toggle_completion(&self, owner_telegram_id: i64, id_task: i32) -> Result<bool> {
        let task = self
            .tasks
            .toggle_completion(owner_telegram_id, id_task, Utc::now())
            .await?
            .ok_or(TaskBuddyError::TaskNotFound { id_task })?;

        info!(owner_telegram_id = owner_telegram_id, id_task = id_task, status = task.status, "Task completion toggled");
        Ok(task.status)
    }

    pub async fn delete(&self, owner_telegram_id: i64, id_task: i32) -> Result<()> {
        if !self.tasks.delete(owner_telegram_id, id_task).await? {
            return Err(TaskBuddyError::TaskNotFound { id_task });
        }
        info!(owner_telegram_id = owner_telegram_id, id_task = id_task, "Task deleted");
        Ok(())
    }

    pub async fn delete_all(&self, owner_telegram_id: i64) -> Result<u64> {
        let removed = self.tasks.delete_all(owner_telegram_id).await?;
        info!(owner_telegram_id = owner_telegram_id, removed = removed, "All tasks deleted");
        Ok(removed)
    }

    pub async fn update_name(&self, owner_telegram_id: i64, id_task: i32, name: &str) -> Result<()> {
        let name = validate_task_name(name)?;
        found(self.tasks.update_name(owner_telegram_id, id_task, name).await?, id_task)
    }

    pub async fn update_description(&self, owner_telegram_id: i64, id_task: i32, description: &str) -> Result<()> {
        let description = validate_description(description)?;
        found(self.tasks.update_description(owner_telegram_id, id_task, description).await?, id_task)
    }

    /// Move the start; it must stay before the current end
    pub async fn update_start_time(&self, owner_telegram_id: i64, id_task: i32, start_time: DateTime<Utc>) -> Result<()> {
        let task = self.get(owner_telegram_id, id_task).await?;
        validate_period(start_time, task.end_time)?;
        found(self.tasks.update_start_time(owner_telegram_id, id_task, start_time).await?, id_task)
    }

    /// Move the end; it must stay after the current start
    pub async fn update_end_time(&self, owner_telegram_id: i64, id_task: i32, end_time: DateTime<Utc>) -> Result<()> {
        let task = self.get(owner_telegram_id, id_task).await?;
        validate_period(task.start_time, end_time)?;
        found(self.tasks.update_end_time(owner_telegram_id, id_task, end_time).await?, id_task)
    }
}

fn found(updated: bool, id_task: i32) -> Result<()> {
    if updated {
        Ok(())
    } else {
        Err(TaskBuddyError::TaskNotFound { id_task })
    }
}
