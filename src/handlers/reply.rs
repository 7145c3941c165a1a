//! Sending replies and cleaning up old menus
//!
//! Messages carrying an inline keyboard are remembered in the user's data bag
//! under [`TRACKED_MESSAGES_KEY`] and deleted before the next menu goes out,
//! so the chat only ever shows one live menu.

use teloxide::{Bot, prelude::*, types::{ChatId, InlineKeyboardMarkup, MessageId}};
use tracing::{debug, warn};
use crate::models::StateData;
use crate::state::ContextStore;
use crate::utils::errors::Result;

pub const TRACKED_MESSAGES_KEY: &str = "list_messages_delete_ids";

/// Append a message id to the tracked list
pub fn push_tracked(data: &mut StateData, message_id: i32) -> Result<()> {
    let mut ids = data.get_i64_list(TRACKED_MESSAGES_KEY);
    ids.push(message_id as i64);
    data.insert(TRACKED_MESSAGES_KEY, ids)
}

/// Remove and return the tracked message ids
pub fn take_tracked(data: &mut StateData) -> Vec<i32> {
    let ids = data
        .get_i64_list(TRACKED_MESSAGES_KEY)
        .into_iter()
        .filter_map(|id| i32::try_from(id).ok())
        .collect();
    data.remove(TRACKED_MESSAGES_KEY);
    ids
}

/// Keep only the tracked message ids of a data bag
pub fn retain_tracked(data: &StateData) -> StateData {
    let mut kept = StateData::new();
    if let Some(ids) = data.as_map().get(TRACKED_MESSAGES_KEY) {
        kept = kept.with(TRACKED_MESSAGES_KEY, ids.clone());
    }
    kept
}

/// Delete every tracked menu of the user
pub async fn delete_tracked(bot: &Bot, store: &ContextStore, user_id: i64, chat_id: ChatId) -> Result<()> {
    let mut ids = Vec::new();
    if store.get_data(user_id).contains_key(TRACKED_MESSAGES_KEY) {
        store
            .update_data(user_id, |data| ids = take_tracked(data))
            .await?;
    }

    for id in ids {
        if let Err(e) = bot.delete_message(chat_id, MessageId(id)).await {
            // Messages older than 48 hours cannot be deleted by bots
            debug!(user_id = user_id, message_id = id, error = %e, "Failed to delete tracked message");
        }
    }
    Ok(())
}

/// Replace the current menu with a new one
pub async fn send_menu(
    bot: &Bot,
    store: &ContextStore,
    user_id: i64,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
) -> Result<()> {
    delete_tracked(bot, store, user_id, chat_id).await?;

    let message = bot.send_message(chat_id, text.into()).reply_markup(keyboard).await?;
    let mut push_result = Ok(());
    store
        .update_data(user_id, |data| push_result = push_tracked(data, message.id.0))
        .await?;
    push_result
}

/// Send a plain informational message
pub async fn send_text(bot: &Bot, chat_id: ChatId, text: impl Into<String>) -> Result<()> {
    bot.send_message(chat_id, text.into()).await?;
    Ok(())
}

/// Delete a message the user sent, e.g. one containing a password
pub async fn delete_user_message(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(e) = bot.delete_message(chat_id, message_id).await {
        warn!(chat_id = ?chat_id, message_id = message_id.0, error = %e, "Failed to delete user message");
    }
}
