//! Inline keyboards of every menu

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::handlers::callbacks::CallbackAction;
use crate::models::{TaskField, TaskFilter};

fn button(text: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_data())
}

fn main_menu_row(owner: Option<i64>) -> Vec<InlineKeyboardButton> {
    vec![button("🏠 Main menu", CallbackAction::MainMenu { owner })]
}

pub fn registration_authorization() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📝 Register", CallbackAction::Register)],
        vec![button("🔑 Log in", CallbackAction::Login)],
    ])
}

pub fn main_menu(owner: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📋 Tasks", CallbackAction::Tasks { owner })],
        vec![button("⚙️ Settings", CallbackAction::Settings { owner })],
        vec![button("🚪 Log out", CallbackAction::Logout { owner })],
    ])
}

pub fn settings(owner: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("Change username", CallbackAction::ChangeUsername { owner })],
        vec![button("Change login name", CallbackAction::ChangeLoginName { owner })],
        vec![button("Change password", CallbackAction::ChangePassword { owner })],
        vec![button("🗑 Delete account", CallbackAction::DeleteAccount { owner })],
        main_menu_row(Some(owner)),
    ])
}

pub fn delete_account_confirm(owner: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("Yes, delete my account", CallbackAction::DeleteAccountConfirm { owner })],
        vec![button("Cancel", CallbackAction::Settings { owner })],
    ])
}

pub fn tasks(owner: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("👀 View tasks", CallbackAction::ViewTasks { owner })],
        vec![button("➕ Create task", CallbackAction::CreateTask { owner })],
        vec![button("✏️ Manage task", CallbackAction::ManageTasks { owner })],
        vec![button("🗑 Delete all tasks", CallbackAction::DeleteAllTasks { owner })],
        main_menu_row(Some(owner)),
    ])
}

pub fn view_tasks(owner: i64) -> InlineKeyboardMarkup {
    let list = |text: &str, filter: TaskFilter| vec![button(text, CallbackAction::ListTasks { filter, owner })];
    InlineKeyboardMarkup::new(vec![
        list("Current tasks", TaskFilter::Current),
        list("Completed tasks", TaskFilter::Completed),
        list("Overdue tasks", TaskFilter::Overdue),
        list("All tasks", TaskFilter::All),
        back_to_tasks(owner),
    ])
}

/// Actions available for a selected task
pub fn task_actions(id_task: i32, completed: bool, owner: i64) -> InlineKeyboardMarkup {
    let toggle_text = if completed { "↩️ Mark as not done" } else { "✅ Mark as done" };
    let edit = |text: &str, field: TaskField| button(text, CallbackAction::EditTask { field, id_task, owner });

    InlineKeyboardMarkup::new(vec![
        vec![button(toggle_text, CallbackAction::ToggleTask { id_task, owner })],
        vec![edit("Edit name", TaskField::Name), edit("Edit description", TaskField::Description)],
        vec![edit("Edit start", TaskField::StartTime), edit("Edit end", TaskField::EndTime)],
        vec![button("🗑 Delete task", CallbackAction::DeleteTask { id_task, owner })],
        vec![button("Choose another task", CallbackAction::ManageTasks { owner })],
        back_to_tasks(owner),
    ])
}

/// Single button leading back to the main menu, for prompts awaiting text
pub fn cancel(owner: Option<i64>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![main_menu_row(owner)])
}

fn back_to_tasks(owner: i64) -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ Back to tasks", CallbackAction::Tasks { owner })]
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn actions(markup: &InlineKeyboardMarkup) -> Vec<CallbackAction> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => data.parse().unwrap(),
                other => panic!("unexpected button kind {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_buttons_are_owner_scoped() {
        for markup in [main_menu(5), settings(5), tasks(5), view_tasks(5), task_actions(1, false, 5), delete_account_confirm(5)] {
            for action in actions(&markup) {
                assert_eq!(action.owner(), Some(5), "{:?}", action);
            }
        }
    }

    #[test]
    fn test_registration_menu() {
        assert_eq!(actions(&registration_authorization()), vec![CallbackAction::Register, CallbackAction::Login]);
    }

    #[test]
    fn test_task_actions_toggle_label() {
        let open = task_actions(3, false, 5);
        assert_eq!(open.inline_keyboard[0][0].text, "✅ Mark as done");
        let done = task_actions(3, true, 5);
        assert_eq!(done.inline_keyboard[0][0].text, "↩️ Mark as not done");
    }
}
