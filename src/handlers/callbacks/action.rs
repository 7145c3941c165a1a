//! Inline keyboard callback data
//!
//! Every button carries a colon separated payload; owner scoped buttons end
//! with the Telegram id of the account owner.

use std::str::FromStr;
use crate::models::{TaskField, TaskFilter};
use crate::state::Step;
use crate::utils::errors::TaskBuddyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu { owner: Option<i64> },
    Register,
    Login,
    Logout { owner: i64 },
    Settings { owner: i64 },
    ChangeUsername { owner: i64 },
    ChangeLoginName { owner: i64 },
    ChangePassword { owner: i64 },
    DeleteAccount { owner: i64 },
    DeleteAccountConfirm { owner: i64 },
    Tasks { owner: i64 },
    ViewTasks { owner: i64 },
    ListTasks { filter: TaskFilter, owner: i64 },
    CreateTask { owner: i64 },
    ManageTasks { owner: i64 },
    DeleteAllTasks { owner: i64 },
    ToggleTask { id_task: i32, owner: i64 },
    DeleteTask { id_task: i32, owner: i64 },
    EditTask { field: TaskField, id_task: i32, owner: i64 },
}

fn list_key(filter: TaskFilter) -> &'static str {
    match filter {
        TaskFilter::Current => "view_current_tasks",
        TaskFilter::Completed => "view_completed_tasks",
        TaskFilter::Overdue => "view_overdue_tasks",
        TaskFilter::All => "view_all_tasks",
    }
}

impl CallbackAction {
    /// Callback payload of the button
    pub fn to_data(&self) -> String {
        match self {
            CallbackAction::MainMenu { owner: None } => "main_menu".to_string(),
            CallbackAction::MainMenu { owner: Some(owner) } => format!("main_menu:{}", owner),
            CallbackAction::Register => "account:register".to_string(),
            CallbackAction::Login => "account:login".to_string(),
            CallbackAction::Logout { owner } => format!("account:logout:{}", owner),
            CallbackAction::DeleteAccount { owner } => format!("account:delete:{}", owner),
            CallbackAction::DeleteAccountConfirm { owner } => format!("account:delete_confirm:{}", owner),
            CallbackAction::Settings { owner } => format!("settings:{}", owner),
            CallbackAction::ChangeUsername { owner } => format!("settings:username:{}", owner),
            CallbackAction::ChangeLoginName { owner } => format!("settings:login_name:{}", owner),
            CallbackAction::ChangePassword { owner } => format!("settings:password:{}", owner),
            CallbackAction::Tasks { owner } => format!("tasks:{}", owner),
            CallbackAction::ViewTasks { owner } => format!("tasks:view_tasks:{}", owner),
            CallbackAction::ListTasks { filter, owner } => format!("tasks:{}:{}", list_key(*filter), owner),
            CallbackAction::CreateTask { owner } => format!("tasks:create:{}", owner),
            CallbackAction::ManageTasks { owner } => format!("tasks:manage:{}", owner),
            CallbackAction::DeleteAllTasks { owner } => format!("tasks:delete_all:{}", owner),
            CallbackAction::ToggleTask { id_task, owner } => format!("task:toggle:{}:{}", id_task, owner),
            CallbackAction::DeleteTask { id_task, owner } => format!("task:delete:{}:{}", id_task, owner),
            CallbackAction::EditTask { field, id_task, owner } => {
                format!("task:edit:{}:{}:{}", field.as_str(), id_task, owner)
            }
        }
    }

    /// Owner of the account the button acts on, if any
    pub fn owner(&self) -> Option<i64> {
        match *self {
            CallbackAction::MainMenu { owner } => owner,
            CallbackAction::Register | CallbackAction::Login => None,
            CallbackAction::Logout { owner }
            | CallbackAction::Settings { owner }
            | CallbackAction::ChangeUsername { owner }
            | CallbackAction::ChangeLoginName { owner }
            | CallbackAction::ChangePassword { owner }
            | CallbackAction::DeleteAccount { owner }
            | CallbackAction::DeleteAccountConfirm { owner }
            | CallbackAction::Tasks { owner }
            | CallbackAction::ViewTasks { owner }
            | CallbackAction::ListTasks { owner, .. }
            | CallbackAction::CreateTask { owner }
            | CallbackAction::ManageTasks { owner }
            | CallbackAction::DeleteAllTasks { owner }
            | CallbackAction::ToggleTask { owner, .. }
            | CallbackAction::DeleteTask { owner, .. }
            | CallbackAction::EditTask { owner, .. } => Some(owner),
        }
    }

    /// Whether the button may be used while the user is at `step`
    pub fn is_allowed_at(&self, step: Option<Step>) -> bool {
        use Step::*;

        let allowed: &[Step] = match self {
            CallbackAction::MainMenu { .. } => return true,
            CallbackAction::Register | CallbackAction::Login => &[RegistrationAuthorization],
            CallbackAction::Logout { .. } => &[MainMenu, Settings],
            CallbackAction::Settings { .. } => &[MainMenu, Settings],
            CallbackAction::ChangeUsername { .. }
            | CallbackAction::ChangeLoginName { .. }
            | CallbackAction::ChangePassword { .. }
            | CallbackAction::DeleteAccount { .. }
            | CallbackAction::DeleteAccountConfirm { .. } => &[Settings],
            CallbackAction::Tasks { .. } => &[MainMenu, Tasks, TasksView, TasksManage, TasksManageTask],
            CallbackAction::ViewTasks { .. } => &[Tasks, TasksView],
            CallbackAction::ListTasks { .. } => &[TasksView],
            CallbackAction::CreateTask { .. }
            | CallbackAction::DeleteAllTasks { .. } => &[Tasks],
            CallbackAction::ManageTasks { .. } => &[Tasks, TasksManageTask],
            CallbackAction::ToggleTask { .. }
            | CallbackAction::DeleteTask { .. }
            | CallbackAction::EditTask { .. } => &[TasksManageTask],
        };

        step.map_or(false, |step| allowed.contains(&step))
    }
}

impl FromStr for CallbackAction {
    type Err = TaskBuddyError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || TaskBuddyError::InvalidInput(format!("Unknown callback data: {}", data));
        let owner = |value: &str| value.parse::<i64>().map_err(|_| invalid());
        let id = |value: &str| value.parse::<i32>().map_err(|_| invalid());

        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["main_menu"] => CallbackAction::MainMenu { owner: None },
            ["main_menu", o] => CallbackAction::MainMenu { owner: Some(owner(o)?) },
            ["account", "register"] => CallbackAction::Register,
            ["account", "login"] => CallbackAction::Login,
            ["account", "logout", o] => CallbackAction::Logout { owner: owner(o)? },
            ["account", "delete", o] => CallbackAction::DeleteAccount { owner: owner(o)? },
            ["account", "delete_confirm", o] => CallbackAction::DeleteAccountConfirm { owner: owner(o)? },
            ["settings", o] => CallbackAction::Settings { owner: owner(o)? },
            ["settings", "username", o] => CallbackAction::ChangeUsername { owner: owner(o)? },
            ["settings", "login_name", o] => CallbackAction::ChangeLoginName { owner: owner(o)? },
            ["settings", "password", o] => CallbackAction::ChangePassword { owner: owner(o)? },
            ["tasks", o] => CallbackAction::Tasks { owner: owner(o)? },
            ["tasks", "view_tasks", o] => CallbackAction::ViewTasks { owner: owner(o)? },
            ["tasks", "view_current_tasks", o] => CallbackAction::ListTasks { filter: TaskFilter::Current, owner: owner(o)? },
            ["tasks", "view_completed_tasks", o] => CallbackAction::ListTasks { filter: TaskFilter::Completed, owner: owner(o)? },
            ["tasks", "view_overdue_tasks", o] => CallbackAction::ListTasks { filter: TaskFilter::Overdue, owner: owner(o)? },
            ["tasks", "view_all_tasks", o] => CallbackAction::ListTasks { filter: TaskFilter::All, owner: owner(o)? },
            ["tasks", "create", o] => CallbackAction::CreateTask { owner: owner(o)? },
            ["tasks", "manage", o] => CallbackAction::ManageTasks { owner: owner(o)? },
            ["tasks", "delete_all", o] => CallbackAction::DeleteAllTasks { owner: owner(o)? },
            ["task", "toggle", t, o] => CallbackAction::ToggleTask { id_task: id(t)?, owner: owner(o)? },
            ["task", "delete", t, o] => CallbackAction::DeleteTask { id_task: id(t)?, owner: owner(o)? },
            ["task", "edit", f, t, o] => CallbackAction::EditTask {
                field: TaskField::parse(f).ok_or_else(invalid)?,
                id_task: id(t)?,
                owner: owner(o)?,
            },
            _ => return Err(invalid()),
        };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn all_actions(owner: i64) -> Vec<CallbackAction> {
        let mut actions = vec![
            CallbackAction::MainMenu { owner: None },
            CallbackAction::MainMenu { owner: Some(owner) },
            CallbackAction::Register,
            CallbackAction::Login,
            CallbackAction::Logout { owner },
            CallbackAction::Settings { owner },
            CallbackAction::ChangeUsername { owner },
            CallbackAction::ChangeLoginName { owner },
            CallbackAction::ChangePassword { owner },
            CallbackAction::DeleteAccount { owner },
            CallbackAction::DeleteAccountConfirm { owner },
            CallbackAction::Tasks { owner },
            CallbackAction::ViewTasks { owner },
            CallbackAction::CreateTask { owner },
            CallbackAction::ManageTasks { owner },
            CallbackAction::DeleteAllTasks { owner },
            CallbackAction::ToggleTask { id_task: 12, owner },
            CallbackAction::DeleteTask { id_task: 12, owner },
        ];
        for filter in [TaskFilter::Current, TaskFilter::Completed, TaskFilter::Overdue, TaskFilter::All] {
            actions.push(CallbackAction::ListTasks { filter, owner });
        }
        for field in [TaskField::Name, TaskField::Description, TaskField::StartTime, TaskField::EndTime] {
            actions.push(CallbackAction::EditTask { field, id_task: 12, owner });
        }
        actions
    }

    #[test]
    fn test_payloads_parse_back() {
        for action in all_actions(9_876_543_210) {
            let data = action.to_data();
            assert!(data.len() <= 64, "{} exceeds the Telegram limit", data);
            assert_eq!(data.parse::<CallbackAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_known_payloads() {
        assert_eq!(
            "tasks:view_overdue_tasks:42".parse::<CallbackAction>().unwrap(),
            CallbackAction::ListTasks { filter: TaskFilter::Overdue, owner: 42 }
        );
        assert_eq!(
            "task:edit:start:3:42".parse::<CallbackAction>().unwrap(),
            CallbackAction::EditTask { field: TaskField::StartTime, id_task: 3, owner: 42 }
        );
    }

    #[test]
    fn test_invalid_payloads() {
        for data in ["", "tasks", "tasks:abc", "task:toggle:x:1", "task:edit:owner:1:2", "settings:username", "lang:en"] {
            assert_matches!(data.parse::<CallbackAction>(), Err(TaskBuddyError::InvalidInput(_)), "{}", data);
        }
    }

    #[test]
    fn test_owner() {
        assert_eq!(CallbackAction::Register.owner(), None);
        assert_eq!(CallbackAction::MainMenu { owner: None }.owner(), None);
        assert_eq!(CallbackAction::DeleteTask { id_task: 1, owner: 5 }.owner(), Some(5));
    }

    #[test]
    fn test_step_gating() {
        let toggle = CallbackAction::ToggleTask { id_task: 1, owner: 5 };
        assert!(toggle.is_allowed_at(Some(Step::TasksManageTask)));
        assert!(!toggle.is_allowed_at(Some(Step::MainMenu)));
        assert!(!toggle.is_allowed_at(None));

        assert!(CallbackAction::MainMenu { owner: None }.is_allowed_at(None));
        assert!(CallbackAction::Login.is_allowed_at(Some(Step::RegistrationAuthorization)));
        assert!(!CallbackAction::Login.is_allowed_at(Some(Step::MainMenu)));
        assert!(CallbackAction::ListTasks { filter: TaskFilter::All, owner: 5 }.is_allowed_at(Some(Step::TasksView)));
    }
}
