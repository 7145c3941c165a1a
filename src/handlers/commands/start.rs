//! Start command handler
//!
//! Shows the main menu to logged-in users and the registration/authorization
//! menu to everyone else.

use tracing::{debug, info};
use crate::handlers::{keyboards, HandlerContext, OWNER_KEY};
use crate::state::Step;
use crate::utils::errors::Result;

/// Entry point of every flow: /start, /cancel and the main menu button
pub async fn show_start(ctx: &HandlerContext) -> Result<()> {
    match ctx.services.account_service.active_account(ctx.user_id).await? {
        Some(account) => {
            debug!(user_id = ctx.user_id, "Showing main menu");
            if ctx.data().get_i64(OWNER_KEY) != Some(account.owner_telegram_id) {
                ctx.remember(OWNER_KEY, account.owner_telegram_id).await?;
            }
            ctx.go(Step::MainMenu).await?;

            let text = format!(
                "Hello, {}!\n\n\
                 Here you can manage your tasks and your account.",
                account.username
            );
            ctx.menu(text, keyboards::main_menu(account.owner_telegram_id)).await
        }
        None => {
            info!(user_id = ctx.user_id, "User without an active account");
            ctx.go(Step::RegistrationAuthorization).await?;

            let text = "Welcome to TaskBuddy!\n\n\
                        To manage tasks, register a new account or log in to the one \
                        linked to your Telegram profile.";
            ctx.menu(text, keyboards::registration_authorization()).await
        }
    }
}
