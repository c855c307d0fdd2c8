#![forbid(unsafe_code)]

use std::future::Future;

use crm_api::{ApiError, ApiResult};
use crm_core::{NewUser, UserId};
use tracing::{info, warn};

use crate::model::{Mutation, UiUpdate};
use crate::notify::Severity;
use crate::Console;

impl Console {
    pub(crate) fn start_create_user(&mut self, user: NewUser) {
        let api = self.api.clone();
        self.spawn_mutation(Mutation::CreateUser, async move {
            api.create_user(user).await.map(|r| r.message)
        });
    }

    pub(crate) fn start_delete_user(&mut self, id: UserId) {
        let api = self.api.clone();
        self.spawn_mutation(Mutation::DeleteUser(id), async move { api.delete_user(id).await.map(|r| r.message) });
    }

    pub(crate) fn start_clear_users(&mut self) {
        let api = self.api.clone();
        self.spawn_mutation(Mutation::ClearUsers, async move { api.delete_all_users().await.map(|r| r.message) });
    }

    pub(crate) fn start_clear_emails(&mut self) {
        let api = self.api.clone();
        self.spawn_mutation(Mutation::ClearEmails, async move { api.delete_all_emails().await.map(|r| r.message) });
    }

    fn spawn_mutation<F>(&mut self, what: Mutation, call: F)
    where
        F: Future<Output = ApiResult<Option<String>>> + Send + 'static,
    {
        let tx = self.updates_tx.clone();
        info!(mutation = ?what, "mutate: start");
        self.spawn_task("mutate", async move {
            let result = call.await;
            let _ = tx.send(UiUpdate::Mutation { what, result });
        });
    }

    pub(crate) fn finish_mutation(&mut self, what: Mutation, result: Result<Option<String>, ApiError>) {
        match result {
            Ok(server_msg) => {
                info!(mutation = ?what, server = %server_msg.as_deref().unwrap_or("-"), "mutate: ok");
                self.reload(what.reloads());
                self.notifier.show(what.success_text(), Severity::Success);
            }
            Err(e) => {
                warn!(mutation = ?what, error = %e, "mutate: failed");
                self.notifier.show(format!("{}: {}", what.failure_prefix(), e.message()), Severity::Error);
            }
        }
    }
}
