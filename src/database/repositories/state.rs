//! Conversation state repository implementation

use std::time::Instant;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use crate::models::{ConversationState, ConversationStateRow, StateData};
use crate::state::StateBackend;
use crate::utils::errors::Result;
use crate::utils::logging::log_database_operation;

const STATE_COLUMNS: &str = "user_id, step, data, version, updated_at";

// Inserts take the column default, which draws from the same sequence
const NEXT_VERSION: &str = "nextval('fsm_context_version_seq')";

#[derive(Clone)]
#[derive(Debug)]
pub struct StateRepository {
    pool: PgPool,
}

impl StateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn timed<T>(operation: &str, started: Instant, result: &std::result::Result<T, sqlx::Error>) {
    log_database_operation(
        operation,
        "fsm_context",
        started.elapsed().as_millis() as u64,
        result.is_ok(),
    );
}

#[async_trait]
impl StateBackend for StateRepository {
    async fn load_all(&self) -> Result<Vec<ConversationState>> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, ConversationStateRow>(
            &format!("SELECT {} FROM fsm_context", STATE_COLUMNS)
        )
        .fetch_all(&self.pool)
        .await;
        timed("load_all", started, &rows);

        rows?.into_iter().map(ConversationState::try_from).collect()
    }

    async fn find(&self, user_id: i64) -> Result<Option<ConversationState>> {
        let row = sqlx::query_as::<_, ConversationStateRow>(
            &format!("SELECT {} FROM fsm_context WHERE user_id = $1", STATE_COLUMNS)
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ConversationState::try_from).transpose()
    }

    async fn write_step(&self, user_id: i64, step: &str) -> Result<ConversationState> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, ConversationStateRow>(
            &format!(
                r#"
                INSERT INTO fsm_context (user_id, step, data)
                VALUES ($1, $2, '{{}}'::jsonb)
                ON CONFLICT (user_id) DO UPDATE
                SET step = EXCLUDED.step,
                    version = {},
                    updated_at = NOW()
                RETURNING {}
                "#,
                NEXT_VERSION,
                STATE_COLUMNS
            )
        )
        .bind(user_id)
        .bind(step)
        .fetch_one(&self.pool)
        .await;
        timed("write_step", started, &row);

        ConversationState::try_from(row?)
    }

    async fn write_data(&self, user_id: i64, data: &StateData) -> Result<ConversationState> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, ConversationStateRow>(
            &format!(
                r#"
                INSERT INTO fsm_context (user_id, step, data)
                VALUES ($1, '', $2)
                ON CONFLICT (user_id) DO UPDATE
                SET data = EXCLUDED.data,
                    version = {},
                    updated_at = NOW()
                RETURNING {}
                "#,
                NEXT_VERSION,
                STATE_COLUMNS
            )
        )
        .bind(user_id)
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await;
        timed("write_data", started, &row);

        ConversationState::try_from(row?)
    }

    async fn reset(&self, user_id: i64) -> Result<Option<ConversationState>> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, ConversationStateRow>(
            &format!(
                r#"
                UPDATE fsm_context
                SET step = '',
                    data = '{{}}'::jsonb,
                    version = {},
                    updated_at = NOW()
                WHERE user_id = $1
                RETURNING {}
                "#,
                NEXT_VERSION,
                STATE_COLUMNS
            )
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timed("reset", started, &row);

        row?.map(ConversationState::try_from).transpose()
    }

    async fn delete(&self, user_id: i64) -> Result<bool> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM fsm_context WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await;
        timed("delete", started, &result);

        Ok(result?.rows_affected() > 0)
    }
}
