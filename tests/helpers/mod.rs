//! Test helpers module
//!
//! Builders for context stores over the in-memory backend and access to the
//! PostgreSQL test database.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use sqlx::PgPool;
use TaskBuddy::models::{ConversationState, StateData};
use TaskBuddy::state::{ContextStore, MemoryStateBackend};

static INIT: Once = Once::new();

/// Install a test subscriber once per binary
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// A store over a fresh in-memory backend; the backend is returned for
/// inspection and for toggling it offline
pub async fn memory_store() -> (ContextStore, Arc<MemoryStateBackend>) {
    memory_store_with(Vec::new()).await
}

/// A store over an in-memory backend that already holds `states`
pub async fn memory_store_with(states: Vec<ConversationState>) -> (ContextStore, Arc<MemoryStateBackend>) {
    init_tracing();
    let backend = Arc::new(MemoryStateBackend::with_states(states));
    let store = ContextStore::open(backend.clone())
        .await
        .expect("in-memory backend is online");
    (store, backend)
}

pub fn stored_state(user_id: i64, step: &str, data: StateData) -> ConversationState {
    ConversationState::new(user_id, Some(step.to_string()), data)
}

/// Connect to `TEST_DATABASE_URL` and apply migrations. `None` when the
/// variable is not set so database suites skip on machines without PostgreSQL.
pub async fn test_pool() -> Option<PgPool> {
    init_tracing();
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL is not set, skipping database test");
            return None;
        }
    };

    let pool = PgPool::connect(&url).await.expect("Failed to connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// Remove every row the tests may have created
pub async fn reset_database(pool: &PgPool) {
    sqlx::query("TRUNCATE user_tasks, users, fsm_context RESTART IDENTITY CASCADE")
        .execute(pool)
        .await
        .expect("Failed to truncate tables");
}
