#![forbid(unsafe_code)]

use std::time::Instant;

use crm_core::Collection;
use tracing::{info, warn};

use crate::model::{LoadStatus, UiUpdate};
use crate::Console;

impl Console {
    pub(crate) fn start_load_users(&mut self) {
        self.users_status = LoadStatus::Loading;
        let api = self.api.clone();
        let tx = self.updates_tx.clone();
        self.spawn_task("load.users", async move {
            let t0 = Instant::now();
            match api.list_users().await {
                Ok(items) => {
                    info!(items = items.len(), took_ms = %t0.elapsed().as_millis(), "load: users ok");
                    let _ = tx.send(UiUpdate::UsersLoaded(items));
                }
                Err(e) => {
                    warn!(error = %e, "load: users failed");
                    let _ = tx.send(UiUpdate::LoadFailed {
                        collection: Collection::Users,
                        message: format!("Error loading users: {}", e.message()),
                    });
                }
            }
        });
    }

    pub(crate) fn start_load_emails(&mut self) {
        self.emails_status = LoadStatus::Loading;
        let api = self.api.clone();
        let tx = self.updates_tx.clone();
        self.spawn_task("load.emails", async move {
            let t0 = Instant::now();
            match api.list_emails().await {
                Ok(items) => {
                    info!(items = items.len(), took_ms = %t0.elapsed().as_millis(), "load: emails ok");
                    let _ = tx.send(UiUpdate::EmailsLoaded(items));
                }
                Err(e) => {
                    warn!(error = %e, "load: emails failed");
                    let _ = tx.send(UiUpdate::LoadFailed {
                        collection: Collection::Emails,
                        message: format!("Error loading emails: {}", e.message()),
                    });
                }
            }
        });
    }
}
