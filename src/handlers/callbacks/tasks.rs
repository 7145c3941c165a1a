//! Task related callbacks

use tracing::debug;
use crate::handlers::{keyboards, HandlerContext};
use crate::models::{TaskField, TaskFilter};
use crate::state::Step;
use crate::utils::errors::Result;
use crate::utils::helpers::truncate_text;

/// Data bag keys used by the task flows
pub const TASK_ID_KEY: &str = "id_task";
pub const TASK_NAME_KEY: &str = "task_name";
pub const TASK_DESCRIPTION_KEY: &str = "description";
pub const TASK_START_KEY: &str = "start_time";

pub async fn show_tasks_menu(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.reset_flow().await?;
    ctx.go(Step::Tasks).await?;
    ctx.menu(
        "📋 Tasks\n\n\
         View your tasks, create a new one or pick a task to complete, edit or delete it.",
        keyboards::tasks(owner),
    )
    .await
}

pub async fn show_view_menu(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.go(Step::TasksView).await?;
    ctx.menu(
        "Which tasks do you want to see?\n\n\
         Current: started and not finished yet\n\
         Completed: marked as done\n\
         Overdue: ended without being done",
        keyboards::view_tasks(owner),
    )
    .await
}

/// Send one card per task, then the view menu again
pub async fn list(ctx: &HandlerContext, filter: TaskFilter, owner: i64) -> Result<()> {
    let tasks = ctx.services.task_service.list(owner, filter).await?;
    debug!(user_id = ctx.user_id, filter = filter.as_str(), count = tasks.len(), "Listing tasks");

    if tasks.is_empty() {
        ctx.text("You have no tasks of this kind").await?;
    }
    for task in &tasks {
        ctx.text(ctx.services.task_service.format(task)).await?;
    }
    show_view_menu(ctx, owner).await
}

pub async fn start_creation(ctx: &HandlerContext, owner: i64) -> Result<()> {
    ctx.reset_flow().await?;
    ctx.go(Step::TasksCreateName).await?;
    ctx.menu("➕ New task\n\nEnter the task name.", keyboards::cancel(Some(owner))).await
}

/// Ask for the number of the task to manage, listing the user's tasks
pub async fn prompt_task_number(ctx: &HandlerContext, owner: i64) -> Result<()> {
    let tasks = ctx.services.task_service.list(owner, TaskFilter::All).await?;
    ctx.reset_flow().await?;

    if tasks.is_empty() {
        ctx.text("You have no tasks yet").await?;
        return show_tasks_menu(ctx, owner).await;
    }

    let lines: Vec<String> = tasks
        .iter()
        .map(|task| {
            let mark = if task.status { "✅" } else { "▫️" };
            format!("{} #{} {}", mark, task.id_task, truncate_text(&task.task_name, 40))
        })
        .collect();

    ctx.go(Step::TasksManage).await?;
    ctx.menu(
        format!("Send the number of the task:\n\n{}", lines.join("\n")),
        keyboards::cancel(Some(owner)),
    )
    .await
}

/// Select a task and show it with its actions
pub async fn show_task(ctx: &HandlerContext, id_task: i32, owner: i64) -> Result<()> {
    let task = ctx.services.task_service.get(owner, id_task).await?;

    ctx.remember(TASK_ID_KEY, id_task).await?;
    ctx.go(Step::TasksManageTask).await?;
    ctx.menu(
        ctx.services.task_service.format(&task),
        keyboards::task_actions(id_task, task.status, owner),
    )
    .await
}

pub async fn delete_all(ctx: &HandlerContext, owner: i64) -> Result<()> {
    let removed = ctx.services.task_service.delete_all(owner).await?;
    ctx.text(format!("Deleted tasks: {}", removed)).await?;
    show_tasks_menu(ctx, owner).await
}

pub async fn toggle(ctx: &HandlerContext, id_task: i32, owner: i64) -> Result<()> {
    let completed = ctx.services.task_service.toggle_completion(owner, id_task).await?;
    let text = if completed {
        format!("Task #{} is marked as done", id_task)
    } else {
        format!("Task #{} is marked as not done", id_task)
    };
    ctx.text(text).await?;
    show_task(ctx, id_task, owner).await
}

pub async fn delete(ctx: &HandlerContext, id_task: i32, owner: i64) -> Result<()> {
    ctx.services.task_service.delete(owner, id_task).await?;
    ctx.text(format!("Task #{} has been deleted", id_task)).await?;
    show_tasks_menu(ctx, owner).await
}

pub async fn prompt_edit(ctx: &HandlerContext, field: TaskField, id_task: i32, owner: i64) -> Result<()> {
    let prompt = match field {
        TaskField::Name => "Enter the new task name.",
        TaskField::Description => "Enter the new description.",
        TaskField::StartTime => "Enter the new start as DD.MM.YYYY HH:MM.",
        TaskField::EndTime => "Enter the new end as DD.MM.YYYY HH:MM.",
    };

    ctx.remember(TASK_ID_KEY, id_task).await?;
    ctx.go(Step::TasksEdit(field)).await?;
    ctx.menu(prompt, keyboards::cancel(Some(owner))).await
}
