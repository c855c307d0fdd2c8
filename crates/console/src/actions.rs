#![forbid(unsafe_code)]

use crm_api::EmailScope;
use crm_core::{NewUser, Provider, UserId};
use crm_search::{EmailFilter, UserFilter};
use tracing::info;

use crate::model::{BulkKind, Reloads};
use crate::notify::Severity;
use crate::Console;

/// Everything an operator can ask the dashboard to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    SetUserFilter(UserFilter),
    SetEmailFilter(EmailFilter),
    ReloadUsers,
    ReloadEmails,
    ReloadSummary,
    CreateUser(NewUser),
    DeleteUser(UserId),
    /// Confirmation happens in the front end before this is dispatched.
    ClearUsers,
    ClearEmails,
    GenerateUsers(u32),
    QuickGenerateUsers,
    GenerateEmails,
    GenerateSelectedEmails(Vec<Provider>),
    DismissToast,
}

impl Console {
    pub fn dispatch(&mut self, action: Action) {
        info!(action = ?action, "dispatch");
        match action {
            Action::Navigate(name) => self.nav.navigate(&name),
            Action::SetUserFilter(f) => self.user_filter = f,
            Action::SetEmailFilter(f) => self.email_filter = f,
            Action::ReloadUsers => self.start_load_users(),
            Action::ReloadEmails => self.start_load_emails(),
            Action::ReloadSummary => self.reload(Reloads { users: false, emails: false, summary: true }),
            Action::CreateUser(user) => match user.validate() {
                Ok(()) => self.start_create_user(user),
                Err(e) => self.notifier.show(e.to_string(), Severity::Error),
            },
            Action::DeleteUser(id) => self.start_delete_user(id),
            Action::ClearUsers => self.start_clear_users(),
            Action::ClearEmails => self.start_clear_emails(),
            Action::GenerateUsers(count) => self.start_bulk(BulkKind::Users { count }),
            Action::QuickGenerateUsers => {
                let count = self.cfg.quick_users;
                self.start_bulk(BulkKind::Users { count })
            }
            Action::GenerateEmails => self.start_bulk(BulkKind::Emails(EmailScope::All)),
            Action::GenerateSelectedEmails(types) => match EmailScope::selected(types) {
                Ok(scope) => self.start_bulk(BulkKind::Emails(scope)),
                Err(e) => self.notifier.show(e.to_string(), Severity::Error),
            },
            Action::DismissToast => self.notifier.dismiss(),
        }
    }
}
