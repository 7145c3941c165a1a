//! Conversation steps
//!
//! Every label the handlers store in the context store. The store itself
//! accepts any string; handlers only ever go through [`Step`].

use std::fmt;
use std::str::FromStr;
use crate::models::TaskField;
use crate::utils::errors::TaskBuddyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    MainMenu,
    /// No account linked yet: choose between registering and logging in
    RegistrationAuthorization,
    RegistrationLoginName,
    RegistrationUsername,
    RegistrationPassword,
    AuthorizationLoginName,
    AuthorizationPassword,
    Settings,
    SettingsUsername,
    SettingsLoginName,
    SettingsPassword,
    Tasks,
    TasksView,
    TasksCreateName,
    TasksCreateDescription,
    TasksCreateStart,
    TasksCreateEnd,
    /// Waiting for the number of the task to manage
    TasksManage,
    /// A task is selected; its id is in the data bag
    TasksManageTask,
    TasksEdit(TaskField),
}

const ALL_STEPS: [Step; 23] = [
    Step::MainMenu,
    Step::RegistrationAuthorization,
    Step::RegistrationLoginName,
    Step::RegistrationUsername,
    Step::RegistrationPassword,
    Step::AuthorizationLoginName,
    Step::AuthorizationPassword,
    Step::Settings,
    Step::SettingsUsername,
    Step::SettingsLoginName,
    Step::SettingsPassword,
    Step::Tasks,
    Step::TasksView,
    Step::TasksCreateName,
    Step::TasksCreateDescription,
    Step::TasksCreateStart,
    Step::TasksCreateEnd,
    Step::TasksManage,
    Step::TasksManageTask,
    Step::TasksEdit(TaskField::Name),
    Step::TasksEdit(TaskField::Description),
    Step::TasksEdit(TaskField::StartTime),
    Step::TasksEdit(TaskField::EndTime),
];

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::MainMenu => "main_menu",
            Step::RegistrationAuthorization => "registration_authorization",
            Step::RegistrationLoginName => "registration:login_name",
            Step::RegistrationUsername => "registration:username",
            Step::RegistrationPassword => "registration:password",
            Step::AuthorizationLoginName => "authorization:login_name",
            Step::AuthorizationPassword => "authorization:password",
            Step::Settings => "settings",
            Step::SettingsUsername => "settings:username",
            Step::SettingsLoginName => "settings:login_name",
            Step::SettingsPassword => "settings:password",
            Step::Tasks => "tasks",
            Step::TasksView => "tasks:view",
            Step::TasksCreateName => "tasks:create:name",
            Step::TasksCreateDescription => "tasks:create:description",
            Step::TasksCreateStart => "tasks:create:start",
            Step::TasksCreateEnd => "tasks:create:end",
            Step::TasksManage => "tasks:manage",
            Step::TasksManageTask => "tasks:manage:task",
            Step::TasksEdit(TaskField::Name) => "tasks:edit:name",
            Step::TasksEdit(TaskField::Description) => "tasks:edit:description",
            Step::TasksEdit(TaskField::StartTime) => "tasks:edit:start",
            Step::TasksEdit(TaskField::EndTime) => "tasks:edit:end",
        }
    }

    /// Parse a stored label. Empty labels mean "no active flow" and yield `None`.
    pub fn from_label(label: Option<&str>) -> Option<Step> {
        label.filter(|l| !l.is_empty()).and_then(|l| l.parse().ok())
    }

    pub fn all() -> &'static [Step] {
        &ALL_STEPS
    }

    /// Steps reachable only by a user with a linked, logged-in account
    pub fn requires_account(&self) -> bool {
        !matches!(
            self,
            Step::RegistrationAuthorization
                | Step::RegistrationLoginName
                | Step::RegistrationUsername
                | Step::RegistrationPassword
                | Step::AuthorizationLoginName
                | Step::AuthorizationPassword
        )
    }

    /// Steps that wait for free text from the user
    pub fn expects_text(&self) -> bool {
        !matches!(
            self,
            Step::MainMenu | Step::RegistrationAuthorization | Step::Settings | Step::Tasks | Step::TasksView | Step::TasksManageTask
        )
    }

    /// Steps where the user types a password
    pub fn is_password_input(&self) -> bool {
        matches!(
            self,
            Step::RegistrationPassword | Step::AuthorizationPassword | Step::SettingsPassword
        )
    }
}

impl FromStr for Step {
    type Err = TaskBuddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STEPS
            .iter()
            .find(|step| step.as_str() == s)
            .copied()
            .ok_or_else(|| TaskBuddyError::InvalidInput(format!("Unknown conversation step: {}", s)))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Step {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
