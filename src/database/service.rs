//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{DatabasePool, AccountRepository, StateRepository, TaskRepository};
use crate::utils::errors::TaskBuddyError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub accounts: AccountRepository,
    pub tasks: TaskRepository,
    pub states: StateRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            states: StateRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Get system statistics
    pub async fn get_system_stats(&self) -> Result<serde_json::Value, TaskBuddyError> {
        let accounts = self.accounts.count().await?;
        let (tasks, open_tasks): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = FALSE) FROM user_tasks"
        )
        .fetch_one(&self.pool)
        .await?;
        let (states,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fsm_context")
            .fetch_one(&self.pool)
            .await?;

        Ok(serde_json::json!({
            "accounts": accounts,
            "tasks": tasks,
            "open_tasks": open_tasks,
            "conversation_states": states
        }))
    }
}
