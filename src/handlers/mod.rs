//! Bot handlers module
//!
//! This module contains all Telegram bot handlers organized by type:
//! - Command handlers for bot commands
//! - Callback handlers for inline keyboard interactions
//! - Message handlers for text input, routed by the conversation step

pub mod callbacks;
pub mod commands;
pub mod keyboards;
pub mod messages;
pub mod reply;

use std::sync::Arc;
use teloxide::{Bot, types::{ChatId, InlineKeyboardMarkup}};
use tracing::debug;
use crate::models::StateData;
use crate::services::ServiceFactory;
use crate::state::{ContextStore, Step};
use crate::utils::errors::{TaskBuddyError, Result};

// Re-export commonly used handler functions
pub use callbacks::{handle_callback_query, CallbackAction};
pub use commands::{handle_command, Command};
pub use messages::handle_message;

/// Data bag key holding the owner of the logged-in account
pub const OWNER_KEY: &str = "owner_telegram_id";

/// Everything a handler needs to answer one user
#[derive(Clone)]
pub struct HandlerContext {
    pub bot: Bot,
    pub services: Arc<ServiceFactory>,
    pub store: ContextStore,
    pub user_id: i64,
    pub chat_id: ChatId,
}

impl HandlerContext {
    pub fn new(bot: Bot, services: Arc<ServiceFactory>, store: ContextStore, user_id: i64, chat_id: ChatId) -> Self {
        Self {
            bot,
            services,
            store,
            user_id,
            chat_id,
        }
    }

    /// Current step, `None` outside of any flow or for unknown labels
    pub fn step(&self) -> Option<Step> {
        Step::from_label(self.store.get_step(self.user_id).as_deref())
    }

    pub async fn go(&self, step: Step) -> Result<()> {
        self.store.set_step(self.user_id, step).await
    }

    pub fn data(&self) -> StateData {
        self.store.get_data(self.user_id)
    }

    /// Store a single value in the data bag
    pub async fn remember<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let mut data = self.data();
        data.insert(key, value)?;
        self.store.set_data(self.user_id, data).await?;
        Ok(())
    }

    /// Drop the scratch values of the finished flow, keeping the menu
    /// bookkeeping and the account binding
    pub async fn reset_flow(&self) -> Result<()> {
        let current = self.data();
        let mut data = reply::retain_tracked(&current);
        if let Some(owner) = current.get_i64(OWNER_KEY) {
            data.insert(OWNER_KEY, owner)?;
        }
        debug!(user_id = self.user_id, dropped = current.len() - data.len(), "Flow data reset");
        self.store.set_data(self.user_id, data).await?;
        Ok(())
    }

    pub async fn menu(&self, text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Result<()> {
        reply::send_menu(&self.bot, &self.store, self.user_id, self.chat_id, text, keyboard).await
    }

    pub async fn text(&self, text: impl Into<String>) -> Result<()> {
        reply::send_text(&self.bot, self.chat_id, text).await
    }

    /// Tell the user about a user-facing error, pass anything else on
    pub async fn report(&self, result: Result<()>) -> Result<()> {
        match result {
            Err(e) if e.is_user_facing() || matches!(e, TaskBuddyError::InvalidStateTransition { .. }) => {
                debug!(user_id = self.user_id, error = %e, "Reporting error to user");
                self.text(e.user_message()).await
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("user_id", &self.user_id)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}
