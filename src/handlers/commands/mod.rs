//! Command handlers module
//!
//! This module contains handlers for all bot commands like /start, /help, etc.

pub mod help;
pub mod start;

use teloxide::utils::command::BotCommands;
use tracing::debug;
use crate::handlers::HandlerContext;
use crate::utils::errors::Result;
use crate::utils::logging::log_user_action;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "TaskBuddy commands:")]
pub enum Command {
    #[command(description = "Open the main menu")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Abort the current action and return to the main menu")]
    Cancel,
}

/// Main command dispatcher
pub async fn handle_command(ctx: HandlerContext, cmd: Command) -> Result<()> {
    debug!(user_id = ctx.user_id, command = ?cmd, "Processing command");

    match cmd {
        Command::Start => {
            log_user_action(ctx.user_id, "start", None);
            start::show_start(&ctx).await
        }
        Command::Help => help::handle_help(&ctx).await,
        Command::Cancel => {
            log_user_action(ctx.user_id, "cancel", ctx.store.get_step(ctx.user_id).as_deref());
            ctx.reset_flow().await?;
            start::show_start(&ctx).await
        }
    }
}
