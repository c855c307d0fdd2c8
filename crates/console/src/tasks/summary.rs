#![forbid(unsafe_code)]

use std::collections::HashSet;

use tracing::warn;

use crate::model::UiUpdate;
use crate::Console;

impl Console {
    /// Two independent fetches; a failure in one leaves the other region alone
    /// and keeps the previous counts of its own.
    pub(crate) fn start_summary_tasks(&mut self) {
        let api = self.api.clone();
        let tx = self.updates_tx.clone();
        self.spawn_task("summary.users", async move {
            match api.list_users().await {
                Ok(users) => {
                    let _ = tx.send(UiUpdate::SummaryUsers(users.len()));
                }
                Err(e) => warn!(error = %e, "summary: user count failed"),
            }
        });
        let api = self.api.clone();
        let tx = self.updates_tx.clone();
        self.spawn_task("summary.emails", async move {
            match api.list_emails().await {
                Ok(emails) => {
                    let providers = emails.iter().map(|e| e.provider.as_str()).collect::<HashSet<_>>().len();
                    let _ = tx.send(UiUpdate::SummaryEmails { count: emails.len(), providers });
                }
                Err(e) => warn!(error = %e, "summary: email count failed"),
            }
        });
    }
}
