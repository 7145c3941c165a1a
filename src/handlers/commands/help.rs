//! Help command handler

use teloxide::utils::command::BotCommands;
use crate::handlers::HandlerContext;
use crate::utils::errors::Result;
use super::Command;

/// Handle /help command
pub async fn handle_help(ctx: &HandlerContext) -> Result<()> {
    let help_text = format!(
        "🤖 TaskBuddy Help\n\n\
         {}\n\n\
         Dates are entered as DD.MM.YYYY HH:MM, for example 05.03.2025 14:00.\n\
         Everything else is done with the menu buttons.",
        Command::descriptions()
    );

    ctx.text(help_text).await
}
