//! Callback query handlers module
//!
//! This module contains handlers for all inline keyboard button callbacks

pub mod account;
pub mod action;
pub mod tasks;

pub use action::CallbackAction;

use teloxide::{types::{CallbackQuery, ChatId}, prelude::*};
use tracing::{info, debug, warn};
use crate::handlers::{commands::start, HandlerContext};
use crate::services::auth::is_owner;
use crate::utils::errors::{TaskBuddyError, Result};
use crate::utils::logging::log_user_action;

/// Main callback query dispatcher
pub async fn handle_callback_query(ctx: HandlerContext, query: CallbackQuery) -> Result<()> {
    let user_id = ctx.user_id;
    debug!(user_id = user_id, callback_data = ?query.data, "Processing callback query");

    // Answer the callback query first to remove loading state
    if let Err(e) = ctx.bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %e, callback_id = %query.id, "Failed to answer callback query");
    }

    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            warn!(user_id = user_id, error = %e, "Ignoring callback");
            return Ok(());
        }
    };

    if let Some(owner) = action.owner() {
        if !is_owner(user_id, owner) {
            warn!(user_id = user_id, owner = owner, "Callback for a foreign account");
            return ctx.text("You have no access to this action").await;
        }
    }

    let step = ctx.step();
    if !action.is_allowed_at(step) {
        let error = TaskBuddyError::InvalidStateTransition {
            from: step.map(|s| s.to_string()).unwrap_or_default(),
            to: data.to_string(),
        };
        warn!(user_id = user_id, error = %error, "Rejected callback");
        return ctx.report(Err(error)).await;
    }

    log_user_action(user_id, "callback", Some(data));
    let result = dispatch(&ctx, action).await;
    ctx.report(result).await
}

async fn dispatch(ctx: &HandlerContext, action: CallbackAction) -> Result<()> {
    // Owner scoped buttons outlive a logout in old chats
    if let Some(owner) = action.owner() {
        if !matches!(action, CallbackAction::MainMenu { .. })
            && ctx.services.account_service.active_account(owner).await?.is_none()
        {
            info!(user_id = ctx.user_id, "Callback without an active account");
            return start::show_start(ctx).await;
        }
    }

    match action {
        CallbackAction::MainMenu { .. } => {
            ctx.reset_flow().await?;
            start::show_start(ctx).await
        }
        CallbackAction::Register => account::start_registration(ctx).await,
        CallbackAction::Login => account::start_authorization(ctx).await,
        CallbackAction::Logout { owner } => account::logout(ctx, owner).await,
        CallbackAction::Settings { owner } => account::show_settings(ctx, owner).await,
        CallbackAction::ChangeUsername { owner } => account::prompt_username(ctx, owner).await,
        CallbackAction::ChangeLoginName { owner } => account::prompt_login_name(ctx, owner).await,
        CallbackAction::ChangePassword { owner } => account::prompt_password(ctx, owner).await,
        CallbackAction::DeleteAccount { owner } => account::confirm_delete(ctx, owner).await,
        CallbackAction::DeleteAccountConfirm { owner } => account::delete(ctx, owner).await,
        CallbackAction::Tasks { owner } => tasks::show_tasks_menu(ctx, owner).await,
        CallbackAction::ViewTasks { owner } => tasks::show_view_menu(ctx, owner).await,
        CallbackAction::ListTasks { filter, owner } => tasks::list(ctx, filter, owner).await,
        CallbackAction::CreateTask { owner } => tasks::start_creation(ctx, owner).await,
        CallbackAction::ManageTasks { owner } => tasks::prompt_task_number(ctx, owner).await,
        CallbackAction::DeleteAllTasks { owner } => tasks::delete_all(ctx, owner).await,
        CallbackAction::ToggleTask { id_task, owner } => tasks::toggle(ctx, id_task, owner).await,
        CallbackAction::DeleteTask { id_task, owner } => tasks::delete(ctx, id_task, owner).await,
        CallbackAction::EditTask { field, id_task, owner } => tasks::prompt_edit(ctx, field, id_task, owner).await,
    }
}

/// Chat the callback came from, falling back to the private chat with the user
pub fn callback_chat_id(query: &CallbackQuery) -> ChatId {
    query
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId(query.from.id.0 as i64))
}
