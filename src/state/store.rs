//! Conversation context store
//!
//! Write-through cache of per-user conversation state. Reads are served from
//! memory; every mutation goes to the backend first and the row it returns
//! replaces the cached entry.

use std::collections::HashSet;
use std::sync::Arc;
use dashmap::DashMap;
use tracing::{debug, error, info, warn};
use crate::models::{ConversationState, StateData};
use crate::utils::errors::Result;
use super::backend::StateBackend;

#[derive(Clone)]
pub struct ContextStore {
    backend: Arc<dyn StateBackend>,
    cache: Arc<DashMap<i64, ConversationState>>,
}

impl ContextStore {
    /// Create a store with an empty cache. Call [`ContextStore::initialize`]
    /// before serving reads.
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Create a store and load every stored state into the cache
    pub async fn open(backend: Arc<dyn StateBackend>) -> Result<Self> {
        let store = Self::new(backend);
        store.initialize().await?;
        Ok(store)
    }

    /// Replace the cache with the contents of the backend.
    ///
    /// Loaded rows are installed before entries missing from storage are
    /// dropped, so a reload on a running bot never shows an empty store.
    /// Returns the number of states loaded.
    pub async fn initialize(&self) -> Result<usize> {
        let states = match self.backend.load_all().await {
            Ok(states) => states,
            Err(e) => {
                error!(error = %e, "Failed to load conversation states");
                return Err(e);
            }
        };

        let count = states.len();
        let loaded: HashSet<i64> = states.iter().map(|state| state.user_id).collect();
        for state in states {
            self.cache.insert(state.user_id, state);
        }
        self.cache.retain(|user_id, _| loaded.contains(user_id));

        info!(count = count, "Conversation states loaded");
        Ok(count)
    }

    /// Current step of a user, `None` when the user has no state
    pub fn get_step(&self, user_id: i64) -> Option<String> {
        self.cache.get(&user_id).and_then(|entry| entry.step.clone())
    }

    /// Set the step of a user, keeping their data
    pub async fn set_step(&self, user_id: i64, step: impl AsRef<str>) -> Result<()> {
        let step = step.as_ref();
        let previous = self.get_step(user_id);

        let state = match self.backend.write_step(user_id, step).await {
            Ok(state) => state,
            Err(e) => {
                error!(user_id = user_id, step = %step, error = %e, "Failed to write step");
                return Err(e);
            }
        };

        crate::utils::logging::log_state_transition(user_id, previous.as_deref(), step);
        self.refresh(state);
        Ok(())
    }

    /// Data bag of a user, empty when the user has no state
    pub fn get_data(&self, user_id: i64) -> StateData {
        self.cache
            .get(&user_id)
            .map(|entry| entry.data.clone())
            .unwrap_or_default()
    }

    /// Replace the data bag of a user, keeping their step.
    ///
    /// Returns the data as read back from storage.
    pub async fn set_data(&self, user_id: i64, data: StateData) -> Result<StateData> {
        let state = match self.backend.write_data(user_id, &data).await {
            Ok(state) => state,
            Err(e) => {
                error!(user_id = user_id, error = %e, "Failed to write state data");
                return Err(e);
            }
        };

        debug!(user_id = user_id, keys = state.data.len(), "State data written");
        let stored = state.data.clone();
        self.refresh(state);
        Ok(stored)
    }

    /// Read-modify-write of the data bag
    pub async fn update_data<F>(&self, user_id: i64, update: F) -> Result<StateData>
    where
        F: FnOnce(&mut StateData),
    {
        let mut data = self.get_data(user_id);
        update(&mut data);
        self.set_data(user_id, data).await
    }

    /// Reset step and data of a user.
    ///
    /// Returns `false` and leaves storage untouched when the user has no state.
    pub async fn clear(&self, user_id: i64) -> Result<bool> {
        match self.backend.reset(user_id).await {
            Ok(Some(state)) => {
                debug!(user_id = user_id, "Conversation state cleared");
                self.refresh(state);
                Ok(true)
            }
            Ok(None) => {
                warn!(user_id = user_id, "Clear requested for user without conversation state");
                Ok(false)
            }
            Err(e) => {
                error!(user_id = user_id, error = %e, "Failed to clear conversation state");
                Err(e)
            }
        }
    }

    /// Delete the stored row of a user and drop it from the cache.
    ///
    /// Returns `false` when storage had no row for the user.
    pub async fn remove(&self, user_id: i64) -> Result<bool> {
        let removed = match self.backend.delete(user_id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(user_id = user_id, error = %e, "Failed to delete conversation state");
                return Err(e);
            }
        };

        self.cache.remove(&user_id);
        debug!(user_id = user_id, removed = removed, "Conversation state removed");
        Ok(removed)
    }

    /// Full cached state of a user
    pub fn state(&self, user_id: i64) -> Option<ConversationState> {
        self.cache.get(&user_id).map(|entry| entry.clone())
    }

    /// Whether the user is currently at the given step
    pub fn is_at(&self, user_id: i64, step: impl AsRef<str>) -> bool {
        self.cache
            .get(&user_id)
            .map_or(false, |entry| entry.step.as_deref() == Some(step.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn user_ids(&self) -> Vec<i64> {
        self.cache.iter().map(|entry| *entry.key()).collect()
    }

    /// Install a row returned by the backend unless a newer one is cached
    fn refresh(&self, state: ConversationState) {
        let user_id = state.user_id;
        let version = state.version;
        let mut stale = false;

        self.cache
            .entry(user_id)
            .and_modify(|cached| {
                if state.version >= cached.version {
                    *cached = state.clone();
                } else {
                    stale = true;
                }
            })
            .or_insert_with(|| state.clone());

        if stale {
            debug!(user_id = user_id, version = version, "Skipped stale state refresh");
        }
    }
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
