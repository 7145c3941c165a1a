//! Task repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::task::{Task, CreateTaskRequest, TaskFilter};
use crate::utils::errors::TaskBuddyError;

const TASK_COLUMNS: &str = "task_uuid, id_task, owner_telegram_id, task_name, description, start_time, end_time, \
                            completion_time, status, start_reminded, end_reminded";

#[derive(Clone)]
#[derive(Debug)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new task
    pub async fn create(&self, request: CreateTaskRequest) -> Result<Task, TaskBuddyError> {
        let task = sqlx::query_as::<_, Task>(
            &format!(
                r#"
                INSERT INTO user_tasks (owner_telegram_id, task_name, description, start_time, end_time)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                TASK_COLUMNS
            )
        )
        .bind(request.owner_telegram_id)
        .bind(request.task_name)
        .bind(request.description)
        .bind(request.start_time)
        .bind(request.end_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    /// Find a task of the given owner
    pub async fn find(&self, owner_telegram_id: i64, id_task: i32) -> Result<Option<Task>, TaskBuddyError> {
        let task = sqlx::query_as::<_, Task>(
            &format!("SELECT {} FROM user_tasks WHERE owner_telegram_id = $1 AND id_task = $2", TASK_COLUMNS)
        )
        .bind(owner_telegram_id)
        .bind(id_task)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    /// List tasks of an owner matching the filter at `now`, ordered by start time
    pub async fn list(&self, owner_telegram_id: i64, filter: TaskFilter, now: DateTime<Utc>) -> Result<Vec<Task>, TaskBuddyError> {
        let condition = match filter {
            TaskFilter::Current => "AND status = FALSE AND start_time < $2 AND end_time > $2",
            TaskFilter::Overdue => "AND status = FALSE AND end_time < $2",
            TaskFilter::Completed => "AND status = TRUE",
            TaskFilter::All => "",
        };
        let sql = format!(
            "SELECT {} FROM user_tasks WHERE owner_telegram_id = $1 {} ORDER BY start_time, id_task",
            TASK_COLUMNS, condition
        );

        let mut query = sqlx::query_as::<_, Task>(&sql).bind(owner_telegram_id);
        if matches!(filter, TaskFilter::Current | TaskFilter::Overdue) {
            query = query.bind(now);
        }
        let tasks = query.fetch_all(&self.pool).await?;

        Ok(tasks)
    }

    /// Flip the completion flag, returning the updated task
    pub async fn toggle_completion(&self, owner_telegram_id: i64, id_task: i32, now: DateTime<Utc>) -> Result<Option<Task>, TaskBuddyError> {
        let task = sqlx::query_as::<_, Task>(
            &format!(
                r#"
                UPDATE user_tasks
                SET status = NOT status,
                    completion_time = CASE WHEN status THEN NULL ELSE $3 END
                WHERE owner_telegram_id = $1 AND id_task = $2
                RETURNING {}
                "#,
                TASK_COLUMNS
            )
        )
        .bind(owner_telegram_id)
        .bind(id_task)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn update_name(&self, owner_telegram_id: i64, id_task: i32, task_name: &str) -> Result<bool, TaskBuddyError> {
        let result = sqlx::query("UPDATE user_tasks SET task_name = $3 WHERE owner_telegram_id = $1 AND id_task = $2")
            .bind(owner_telegram_id)
            .bind(id_task)
            .bind(task_name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_description(&self, owner_telegram_id: i64, id_task: i32, description: &str) -> Result<bool, TaskBuddyError> {
        let result = sqlx::query("UPDATE user_tasks SET description = $3 WHERE owner_telegram_id = $1 AND id_task = $2")
            .bind(owner_telegram_id)
            .bind(id_task)
            .bind(description)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move the start; a pending start reminder is re-armed
    pub async fn update_start_time(&self, owner_telegram_id: i64, id_task: i32, start_time: DateTime<Utc>) -> Result<bool, TaskBuddyError> {
        let result = sqlx::query(
            "UPDATE user_tasks SET start_time = $3, start_reminded = FALSE WHERE owner_telegram_id = $1 AND id_task = $2"
        )
        .bind(owner_telegram_id)
        .bind(id_task)
        .bind(start_time)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move the end; a pending overdue notice is re-armed
    pub async fn update_end_time(&self, owner_telegram_id: i64, id_task: i32, end_time: DateTime<Utc>) -> Result<bool, TaskBuddyError> {
        let result = sqlx::query(
            "UPDATE user_tasks SET end_time = $3, end_reminded = FALSE WHERE owner_telegram_id = $1 AND id_task = $2"
        )
        .bind(owner_telegram_id)
        .bind(id_task)
        .bind(end_time)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, owner_telegram_id: i64, id_task: i32) -> Result<bool, TaskBuddyError> {
        let result = sqlx::query("DELETE FROM user_tasks WHERE owner_telegram_id = $1 AND id_task = $2")
            .bind(owner_telegram_id)
            .bind(id_task)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every task of an owner, returning how many were removed
    pub async fn delete_all(&self, owner_telegram_id: i64) -> Result<u64, TaskBuddyError> {
        let result = sqlx::query("DELETE FROM user_tasks WHERE owner_telegram_id = $1")
            .bind(owner_telegram_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Unfinished tasks starting before `until` that were not reminded yet
    pub async fn due_start_reminders(&self, now: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<Task>, TaskBuddyError> {
        let tasks = sqlx::query_as::<_, Task>(
            &format!(
                r#"
                SELECT {} FROM user_tasks
                WHERE status = FALSE AND start_reminded = FALSE
                  AND start_time > $1 AND start_time <= $2
                ORDER BY start_time
                "#,
                TASK_COLUMNS
            )
        )
        .bind(now)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Unfinished tasks past their end that were not reported yet
    pub async fn due_overdue_notices(&self, now: DateTime<Utc>) -> Result<Vec<Task>, TaskBuddyError> {
        let tasks = sqlx::query_as::<_, Task>(
            &format!(
                r#"
                SELECT {} FROM user_tasks
                WHERE status = FALSE AND end_reminded = FALSE AND end_time < $1
                ORDER BY end_time
                "#,
                TASK_COLUMNS
            )
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    pub async fn mark_start_reminded(&self, task_uuid: uuid::Uuid) -> Result<(), TaskBuddyError> {
        sqlx::query("UPDATE user_tasks SET start_reminded = TRUE WHERE task_uuid = $1")
            .bind(task_uuid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn mark_end_reminded(&self, task_uuid: uuid::Uuid) -> Result<(), TaskBuddyError> {
        sqlx::query("UPDATE user_tasks SET end_reminded = TRUE WHERE task_uuid = $1")
            .bind(task_uuid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
