//! Persistent backends for conversation state
//!
//! The context store talks to its storage through [`StateBackend`]. The
//! PostgreSQL implementation lives in the repositories module; the in-memory
//! one here backs tests and storage-less development runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use crate::models::{ConversationState, StateData};
use crate::utils::errors::{TaskBuddyError, Result};

/// Storage operations the context store relies on.
///
/// `write_step` and `write_data` must each be a single atomic operation that
/// creates the row when missing, changes only the named field when present,
/// bumps the row version and returns the row as stored.
///
/// Versions are drawn from one counter shared by every row, so they never
/// go backwards for a user, even after their row is deleted and created again.
#[async_trait]
pub trait StateBackend: Send + Sync + 'static {
    /// Every stored state
    async fn load_all(&self) -> Result<Vec<ConversationState>>;

    /// A single state, if present
    async fn find(&self, user_id: i64) -> Result<Option<ConversationState>>;

    /// Set the step, preserving data; new rows get empty data
    async fn write_step(&self, user_id: i64, step: &str) -> Result<ConversationState>;

    /// Replace the data, preserving the step; new rows get an empty step
    async fn write_data(&self, user_id: i64, data: &StateData) -> Result<ConversationState>;

    /// Reset step and data of an existing row. `None` when no row exists.
    async fn reset(&self, user_id: i64) -> Result<Option<ConversationState>>;

    /// Remove the row entirely. `false` when no row exists.
    async fn delete(&self, user_id: i64) -> Result<bool>;
}

/// Mutex-guarded in-memory backend
#[derive(Debug, Default)]
pub struct MemoryStateBackend {
    rows: Mutex<HashMap<i64, ConversationState>>,
    last_version: AtomicI64,
    offline: AtomicBool,
}

impl MemoryStateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the backend, as if rows had been written by an earlier run
    pub fn with_states(states: impl IntoIterator<Item = ConversationState>) -> Self {
        let rows: HashMap<_, _> = states.into_iter().map(|s| (s.user_id, s)).collect();
        let last_version = rows.values().map(|s| s.version).max().unwrap_or(0);
        Self {
            rows: Mutex::new(rows),
            last_version: AtomicI64::new(last_version),
            offline: Default::default(),
        }
    }

    /// Make every subsequent call fail as if storage were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored rows, bypassing the offline switch
    pub async fn row_count(&self) -> usize {
        self.rows.lock().await.len()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TaskBuddyError::ServiceUnavailable(
                "state storage is unreachable".to_string(),
            ));
        }
        Ok(())
    }

    fn next_version(&self) -> i64 {
        self.last_version.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl StateBackend for MemoryStateBackend {
    async fn load_all(&self) -> Result<Vec<ConversationState>> {
        self.ensure_online()?;
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn find(&self, user_id: i64) -> Result<Option<ConversationState>> {
        self.ensure_online()?;
        Ok(self.rows.lock().await.get(&user_id).cloned())
    }

    async fn write_step(&self, user_id: i64, step: &str) -> Result<ConversationState> {
        self.ensure_online()?;
        let mut rows = self.rows.lock().await;
        let version = self.next_version();
        let state = rows
            .entry(user_id)
            .and_modify(|state| {
                state.step = Some(step.to_string());
                state.updated_at = Utc::now();
            })
            .or_insert_with(|| ConversationState::new(user_id, Some(step.to_string()), StateData::new()));
        state.version = version;
        Ok(state.clone())
    }

    async fn write_data(&self, user_id: i64, data: &StateData) -> Result<ConversationState> {
        self.ensure_online()?;
        let mut rows = self.rows.lock().await;
        let version = self.next_version();
        let state = rows
            .entry(user_id)
            .and_modify(|state| {
                state.data = data.clone();
                state.updated_at = Utc::now();
            })
            .or_insert_with(|| ConversationState::new(user_id, Some(String::new()), data.clone()));
        state.version = version;
        Ok(state.clone())
    }

    async fn reset(&self, user_id: i64) -> Result<Option<ConversationState>> {
        self.ensure_online()?;
        let mut rows = self.rows.lock().await;
        Ok(rows.get_mut(&user_id).map(|state| {
            state.step = Some(String::new());
            state.data = StateData::new();
            state.version = self.next_version();
            state.updated_at = Utc::now();
            state.clone()
        }))
    }

    async fn delete(&self, user_id: i64) -> Result<bool> {
        self.ensure_online()?;
        Ok(self.rows.lock().await.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_field_level_writes() {
        let backend = MemoryStateBackend::new();

        let created = backend.write_step(1, "main_menu").await.unwrap();
        assert_eq!(created.version, 1);
        assert!(created.data.is_empty());

        let data = StateData::new().with("k", "v");
        let updated = backend.write_data(1, &data).await.unwrap();
        assert_eq!(updated.step.as_deref(), Some("main_menu"));
        assert_eq!(updated.data, data);
        assert_eq!(updated.version, 2);

        let fresh = backend.write_data(2, &data).await.unwrap();
        assert_eq!(fresh.step.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_versions_survive_delete() {
        let backend = MemoryStateBackend::new();
        backend.write_step(1, "a").await.unwrap();
        let before = backend.write_step(1, "b").await.unwrap();

        assert!(backend.delete(1).await.unwrap());
        assert!(!backend.delete(1).await.unwrap());
        assert_eq!(backend.row_count().await, 0);

        let recreated = backend.write_step(1, "c").await.unwrap();
        assert!(recreated.version > before.version);

        let other = backend.write_data(2, &StateData::new()).await.unwrap();
        assert!(other.version > recreated.version);
    }

    #[tokio::test]
    async fn test_preloaded_versions_continue() {
        let mut state = ConversationState::new(1, Some("main_menu".to_string()), StateData::new());
        state.version = 41;
        let backend = MemoryStateBackend::with_states(vec![state]);

        let created = backend.write_step(2, "tasks").await.unwrap();
        assert_eq!(created.version, 42);
    }

    #[tokio::test]
    async fn test_reset_missing_row() {
        let backend = MemoryStateBackend::new();
        assert!(backend.reset(99).await.unwrap().is_none());
        assert_eq!(backend.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_offline() {
        let backend = MemoryStateBackend::new();
        backend.set_offline(true);
        assert_matches!(backend.load_all().await, Err(TaskBuddyError::ServiceUnavailable(_)));
        assert_matches!(backend.write_step(1, "x").await, Err(TaskBuddyError::ServiceUnavailable(_)));

        backend.set_offline(false);
        assert!(backend.write_step(1, "x").await.is_ok());
    }
}
