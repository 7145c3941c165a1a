//! Account related callbacks: registration, authorization and settings

use tracing::info;
use crate::handlers::{commands::start, keyboards, reply, HandlerContext};
use crate::services::auth::{LOGIN_NAME_MAX_LENGTH, PASSWORD_MIN_LENGTH, PASSWORD_SPECIALS};
use crate::state::Step;
use crate::utils::errors::{TaskBuddyError, Result};

pub fn login_name_prompt() -> String {
    format!(
        "Enter a login name: 3-{} Latin letters, digits, '_', '.' or '-'.",
        LOGIN_NAME_MAX_LENGTH
    )
}

pub fn password_prompt() -> String {
    format!(
        "Enter a password: at least {} characters with a lowercase and an uppercase \
         Latin letter, a digit and one of {}.\nThe message will be deleted right away.",
        PASSWORD_MIN_LENGTH, PASSWORD_SPECIALS
    )
}

pub async fn start_registration(ctx: &HandlerContext) -> Result<()> {
    ctx.reset_flow().await?;
    ctx.go(Step::RegistrationLoginName).await?;
    ctx.menu(format!("📝 Registration\n\n{}", login_name_prompt()), keyboards::cancel(None)).await
}

pub async fn start_authorization(ctx: &HandlerContext) -> Result<()> {
    ctx.reset_flow().await?;
    ctx.go(Step::AuthorizationLoginName).await?;
    ctx.menu("🔑 Log in\n\nEnter your login name.", keyboards::cancel(None)).await
}

pub async fn logout(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.services.account_service.logout(owner).await?;
    let data = reply::retain_tracked(&ctx.data());
    ctx.store.set_data(ctx.user_id, data).await?;
    ctx.text("You have logged out").await?;
    start::show_start(ctx).await
}

pub async fn show_settings(ctx: &HandlerContext, owner: i64) -> Result<()> {
    let account = ctx
        .services
        .account_service
        .find_by_owner(owner)
        .await?
        .ok_or(TaskBuddyError::AccountNotFound { owner_telegram_id: owner })?;

    ctx.go(Step::Settings).await?;
    let text = format!(
        "⚙️ Settings\n\n\
         Username: {}\n\
         Login name: {}\n\
         Registered: {}",
        account.username,
        account.login_name,
        account.registration_date.format("%d.%m.%Y"),
    );
    ctx.menu(text, keyboards::settings(owner)).await
}

pub async fn prompt_username(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.go(Step::SettingsUsername).await?;
    ctx.menu("Enter a new username.", keyboards::cancel(Some(owner))).await
}

pub async fn prompt_login_name(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.go(Step::SettingsLoginName).await?;
    ctx.menu(login_name_prompt(), keyboards::cancel(Some(owner))).await
}

pub async fn prompt_password(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.go(Step::SettingsPassword).await?;
    ctx.menu(password_prompt(), keyboards::cancel(Some(owner))).await
}

pub async fn confirm_delete(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.menu(
        "Are you sure you want to delete your account? All of your tasks will be deleted as well.",
        keyboards::delete_account_confirm(owner),
    )
    .await
}

/// Delete the account along with its conversation state; menu bookkeeping
/// is written back so old menus still get cleaned up
pub async fn delete(ctx: &HandlerContext, owner: i64) -> Result<()> {
    let tracked = reply::retain_tracked(&ctx.data());
    ctx.services.account_service.delete(owner).await?;
    info!(user_id = ctx.user_id, "Account deleted by owner");

    ctx.store.remove(ctx.user_id).await?;
    ctx.store.set_data(ctx.user_id, tracked).await?;
    ctx.text("Your account has been deleted").await?;
    start::show_start(ctx).await
}
