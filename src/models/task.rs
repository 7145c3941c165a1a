//! Task model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_uuid: Uuid,
    pub id_task: i32,
    pub owner_telegram_id: i64,
    pub task_name: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub status: bool,
    pub start_reminded: bool,
    pub end_reminded: bool,
}

#[derive(Debug, Clone)]
pub struct CreateTaskRequest {
    pub owner_telegram_id: i64,
    pub task_name: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Which tasks of a user to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    /// Started, not yet ended and not completed
    Current,
    /// Ended without being completed
    Overdue,
    Completed,
    All,
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::Current => "current",
            TaskFilter::Overdue => "overdue",
            TaskFilter::Completed => "completed",
            TaskFilter::All => "all",
        }
    }

    /// Whether a task belongs to this filter at the given instant
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::Current => !task.status && task.start_time < now && task.end_time > now,
            TaskFilter::Overdue => !task.status && task.end_time < now,
            TaskFilter::Completed => task.status,
            TaskFilter::All => true,
        }
    }
}

/// Display status of a single task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Overdue,
    InProgress,
    Scheduled,
}

impl TaskStatus {
    pub fn of(task: &Task, now: DateTime<Utc>) -> Self {
        if task.status {
            TaskStatus::Completed
        } else if task.end_time < now {
            TaskStatus::Overdue
        } else if task.start_time <= now {
            TaskStatus::InProgress
        } else {
            TaskStatus::Scheduled
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Overdue => "overdue",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Scheduled => "scheduled",
        }
    }
}

/// Editable task field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Name,
    Description,
    StartTime,
    EndTime,
}

impl TaskField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskField::Name => "name",
            TaskField::Description => "description",
            TaskField::StartTime => "start",
            TaskField::EndTime => "end",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(TaskField::Name),
            "description" => Some(TaskField::Description),
            "start" => Some(TaskField::StartTime),
            "end" => Some(TaskField::EndTime),
            _ => None,
        }
    }
}
