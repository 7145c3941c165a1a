//! Message handlers module
//!
//! Handles incoming text messages. What a message means depends on the step
//! the user is at: a login name, a password, a task name, a date, ...

use teloxide::types::Message;
use tracing::{debug, info, warn};
use crate::handlers::callbacks::{account, tasks};
use crate::handlers::callbacks::tasks::{TASK_DESCRIPTION_KEY, TASK_ID_KEY, TASK_NAME_KEY, TASK_START_KEY};
use crate::handlers::{commands::start, keyboards, reply, HandlerContext};
use crate::models::{StateData, TaskField};
use crate::services::auth::{validate_login_name, validate_password, validate_username};
use crate::services::task::{validate_description, validate_period, validate_task_name};
use crate::state::Step;
use crate::utils::errors::{TaskBuddyError, Result};
use crate::utils::logging::log_user_action;

const LOGIN_NAME_KEY: &str = "login_name";
const USERNAME_KEY: &str = "username";

/// Handle incoming text messages
pub async fn handle_message(ctx: HandlerContext, msg: Message) -> Result<()> {
    if !ctx.chat_id.is_user() {
        debug!(chat_id = ?ctx.chat_id, "Ignoring message outside of a private chat");
        return Ok(());
    }

    let step = ctx.step();
    debug!(user_id = ctx.user_id, step = ?step, "Processing message");

    let Some(step) = step.filter(Step::expects_text) else {
        // Nothing is waiting for text: bring the menu back
        return start::show_start(&ctx).await;
    };

    if step.is_password_input() {
        reply::delete_user_message(&ctx.bot, ctx.chat_id, msg.id).await;
    }

    let Some(text) = msg.text() else {
        return ctx.text("Please send a text message").await;
    };

    if step.requires_account()
        && ctx.services.account_service.active_account(ctx.user_id).await?.is_none()
    {
        warn!(user_id = ctx.user_id, step = %step, "Text input without an active account");
        return start::show_start(&ctx).await;
    }

    let result = route(&ctx, step, text).await;
    ctx.report(result).await
}

async fn route(ctx: &HandlerContext, step: Step, text: &str) -> Result<()> {
    let owner = ctx.user_id;

    match step {
        Step::RegistrationLoginName => registration_login_name(ctx, text).await,
        Step::RegistrationUsername => registration_username(ctx, text).await,
        Step::RegistrationPassword => registration_password(ctx, text).await,
        Step::AuthorizationLoginName => {
            ctx.remember(LOGIN_NAME_KEY, text.trim()).await?;
            ctx.go(Step::AuthorizationPassword).await?;
            ctx.menu("Enter your password.\nThe message will be deleted right away.", keyboards::cancel(None)).await
        }
        Step::AuthorizationPassword => authorization_password(ctx, text).await,
        Step::SettingsUsername => {
            ctx.services.account_service.update_username(owner, text).await?;
            ctx.text("Username changed").await?;
            account::show_settings(ctx, owner).await
        }
        Step::SettingsLoginName => {
            ctx.services.account_service.update_login_name(owner, text.trim()).await?;
            ctx.text("Login name changed").await?;
            account::show_settings(ctx, owner).await
        }
        Step::SettingsPassword => {
            ctx.services.account_service.update_password(owner, text).await?;
            ctx.text("Password changed").await?;
            account::show_settings(ctx, owner).await
        }
        Step::TasksCreateName => {
            let name = validate_task_name(text)?;
            ctx.remember(TASK_NAME_KEY, name).await?;
            ctx.go(Step::TasksCreateDescription).await?;
            ctx.menu("Enter the task description.", keyboards::cancel(Some(owner))).await
        }
        Step::TasksCreateDescription => {
            let description = validate_description(text)?;
            ctx.remember(TASK_DESCRIPTION_KEY, description).await?;
            ctx.go(Step::TasksCreateStart).await?;
            ctx.menu("Enter the start of the task as DD.MM.YYYY HH:MM.", keyboards::cancel(Some(owner))).await
        }
        Step::TasksCreateStart => {
            let start = ctx.services.task_service.parse_time(text)?;
            ctx.remember(TASK_START_KEY, start.timestamp()).await?;
            ctx.go(Step::TasksCreateEnd).await?;
            ctx.menu(
                format!(
                    "Enter the end of the task as DD.MM.YYYY HH:MM. It must be later than {}.",
                    text.trim()
                ),
                keyboards::cancel(Some(owner)),
            )
            .await
        }
        Step::TasksCreateEnd => create_task(ctx, text).await,
        Step::TasksManage => {
            let id_task = text
                .trim()
                .trim_start_matches('#')
                .parse::<i32>()
                .map_err(|_| TaskBuddyError::InvalidInput("Send the task number, e.g. 12".to_string()))?;
            tasks::show_task(ctx, id_task, owner).await
        }
        Step::TasksEdit(field) => edit_task(ctx, field, text).await,
        _ => start::show_start(ctx).await,
    }
}

async fn registration_login_name(ctx: &HandlerContext, text: &str) -> Result<()> {
    let login_name = text.trim();
    validate_login_name(login_name)?;
    if ctx.services.account_service.find_by_login_name(login_name).await?.is_some() {
        return Err(TaskBuddyError::InvalidInput(format!(
            "Login name '{}' is already taken, try another one",
            login_name
        )));
    }

    ctx.remember(LOGIN_NAME_KEY, login_name).await?;
    ctx.go(Step::RegistrationUsername).await?;
    ctx.menu("Enter the name I should call you by.", keyboards::cancel(None)).await
}

async fn registration_username(ctx: &HandlerContext, text: &str) -> Result<()> {
    let username = validate_username(text)?;
    ctx.remember(USERNAME_KEY, username).await?;
    ctx.go(Step::RegistrationPassword).await?;
    ctx.menu(account::password_prompt(), keyboards::cancel(None)).await
}

async fn registration_password(ctx: &HandlerContext, password: &str) -> Result<()> {
    validate_password(password)?;

    let data = ctx.data();
    let (Some(login_name), Some(username)) = (data.get_string(LOGIN_NAME_KEY), data.get_string(USERNAME_KEY)) else {
        warn!(user_id = ctx.user_id, "Registration data is missing, restarting");
        return account::start_registration(ctx).await;
    };

    let result = ctx
        .services
        .account_service
        .register(ctx.user_id, &login_name, &username, password)
        .await;

    match result {
        Ok(account) => {
            log_user_action(ctx.user_id, "register", Some(&account.login_name));
            finish_login(ctx, account.owner_telegram_id).await?;
            ctx.text("Registration completed").await?;
            start::show_start(ctx).await
        }
        // Login name taken in the meantime or a second account: start over
        Err(TaskBuddyError::InvalidInput(message)) => {
            ctx.text(message).await?;
            account::start_registration(ctx).await
        }
        Err(e) => Err(e),
    }
}

async fn authorization_password(ctx: &HandlerContext, password: &str) -> Result<()> {
    let Some(login_name) = ctx.data().get_string(LOGIN_NAME_KEY) else {
        return account::start_authorization(ctx).await;
    };

    match ctx.services.account_service.login(ctx.user_id, &login_name, password).await {
        Ok(account) => {
            log_user_action(ctx.user_id, "login", Some(&account.login_name));
            finish_login(ctx, account.owner_telegram_id).await?;
            start::show_start(ctx).await
        }
        Err(e @ (TaskBuddyError::Authentication(_) | TaskBuddyError::PermissionDenied(_))) => {
            info!(user_id = ctx.user_id, error = %e, "Authorization failed");
            ctx.text(e.user_message()).await?;
            ctx.reset_flow().await?;
            start::show_start(ctx).await
        }
        Err(e) => Err(e),
    }
}

/// Bind the account to the conversation, dropping the flow data
async fn finish_login(ctx: &HandlerContext, owner: i64) -> Result<()> {
    let mut data = reply::retain_tracked(&ctx.data());
    data.insert(crate::handlers::OWNER_KEY, owner)?;
    ctx.store.set_data(ctx.user_id, data).await?;
    Ok(())
}

async fn create_task(ctx: &HandlerContext, text: &str) -> Result<()> {
    let owner = ctx.user_id;
    let data = ctx.data();
    let Some((name, description, start)) = creation_input(&data) else {
        warn!(user_id = ctx.user_id, "Task creation data is missing, restarting");
        return tasks::start_creation(ctx, owner).await;
    };

    let end = ctx.services.task_service.parse_time(text)?;
    validate_period(start, end)?;

    let task = ctx
        .services
        .task_service
        .create(owner, &name, &description, start, end)
        .await?;
    ctx.text(format!("Task #{} created", task.id_task)).await?;
    tasks::show_tasks_menu(ctx, owner).await
}

fn creation_input(data: &StateData) -> Option<(String, String, chrono::DateTime<chrono::Utc>)> {
    let name = data.get_string(TASK_NAME_KEY)?;
    let description = data.get_string(TASK_DESCRIPTION_KEY).unwrap_or_default();
    let start = chrono::DateTime::from_timestamp(data.get_i64(TASK_START_KEY)?, 0)?;
    Some((name, description, start))
}

async fn edit_task(ctx: &HandlerContext, field: TaskField, text: &str) -> Result<()> {
    let owner = ctx.user_id;
    let Some(id_task) = ctx.data().get_i64(TASK_ID_KEY).and_then(|id| i32::try_from(id).ok()) else {
        return tasks::prompt_task_number(ctx, owner).await;
    };

    let service = &ctx.services.task_service;
    match field {
        TaskField::Name => service.update_name(owner, id_task, text).await?,
        TaskField::Description => service.update_description(owner, id_task, text).await?,
        TaskField::StartTime => {
            let start = service.parse_time(text)?;
            service.update_start_time(owner, id_task, start).await?
        }
        TaskField::EndTime => {
            let end = service.parse_time(text)?;
            service.update_end_time(owner, id_task, end).await?
        }
    }

    ctx.text("Task updated").await?;
    tasks::show_task(ctx, id_task, owner).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_creation_input() {
        let start = Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap();
        let data = StateData::new()
            .with(TASK_NAME_KEY, "Report")
            .with(TASK_START_KEY, start.timestamp());

        let (name, description, parsed) = creation_input(&data).unwrap();
        assert_eq!(name, "Report");
        assert_eq!(description, "");
        assert_eq!(parsed, start);

        assert!(creation_input(&StateData::new().with(TASK_NAME_KEY, "Report")).is_none());
    }
}
