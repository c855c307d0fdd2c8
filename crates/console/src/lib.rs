//! Headless CRM dashboard: the state behind the panels, the background tasks
//! that fill it, the bulk-generation progress surface and the toast slot.

#![forbid(unsafe_code)]

use std::future::Future;
use std::sync::Arc;

use crm_api::CrmApi;
use crm_core::{Email, Snapshot, User};
use crm_search::{EmailFilter, UserFilter};
use crm_store::CollectionStore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

mod actions;
mod config;
mod model;
mod nav;
mod notify;
mod progress;
mod tasks;
mod views;

pub use actions::Action;
pub use config::{DashboardConfig, ProgressConfig};
pub use model::{
    BulkKind, BulkOutcome, LoadStatus, Mutation, ProgressState, Reloads, Summary, UiUpdate, LABEL_COMPLETED,
    LABEL_GENERATING, LABEL_STARTING,
};
pub use nav::{NavState, Panel, FALLBACK_TITLE};
pub use notify::{Notifier, Severity, Toast, ToastStyle};
pub use progress::ProgressTicker;
pub use views::{EmailRow, EmailsView, UserRow, UsersView, NO_RECORDS};

pub(crate) const BULK_TASK: &str = "bulk";

/// Reports the end of a spawned task when its future is dropped, so a panic
/// still releases the in-flight slot.
struct TaskGuard {
    name: &'static str,
    tx: UnboundedSender<UiUpdate>,
    clean: bool,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(UiUpdate::TaskEnded { name: self.name, clean: self.clean });
    }
}

/// Dashboard state, mutated only by [`Console::dispatch`] and [`Console::apply`].
pub struct Console {
    api: Arc<dyn CrmApi>,
    cfg: DashboardConfig,
    nav: NavState,
    users: CollectionStore<User>,
    emails: CollectionStore<Email>,
    users_status: LoadStatus,
    emails_status: LoadStatus,
    user_filter: UserFilter,
    email_filter: EmailFilter,
    summary: Summary,
    progress: Option<ProgressState>,
    notifier: Notifier,
    updates_tx: UnboundedSender<UiUpdate>,
    updates_rx: UnboundedReceiver<UiUpdate>,
    in_flight: usize,
}

impl Console {
    pub fn new(api: Arc<dyn CrmApi>, cfg: DashboardConfig) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            api,
            cfg,
            nav: NavState::default(),
            users: CollectionStore::new(crm_core::Collection::Users),
            emails: CollectionStore::new(crm_core::Collection::Emails),
            users_status: LoadStatus::Idle,
            emails_status: LoadStatus::Idle,
            user_filter: UserFilter::default(),
            email_filter: EmailFilter::default(),
            summary: Summary::default(),
            progress: None,
            notifier: Notifier::new(cfg.toast_ttl),
            updates_tx,
            updates_rx,
            in_flight: 0,
        }
    }

    pub fn from_env(api: Arc<dyn CrmApi>) -> Self {
        Self::new(api, DashboardConfig::from_env())
    }

    /// Initial fill: summary counts and both collections.
    pub fn start(&mut self) {
        info!("console starting");
        self.reload(Reloads::ALL);
    }

    pub fn config(&self) -> &DashboardConfig { &self.cfg }
    pub fn nav(&self) -> &NavState { &self.nav }
    pub fn users(&self) -> Arc<Snapshot<User>> { self.users.current() }
    pub fn emails(&self) -> Arc<Snapshot<Email>> { self.emails.current() }
    pub fn users_status(&self) -> &LoadStatus { &self.users_status }
    pub fn emails_status(&self) -> &LoadStatus { &self.emails_status }
    pub fn user_filter(&self) -> &UserFilter { &self.user_filter }
    pub fn email_filter(&self) -> &EmailFilter { &self.email_filter }
    pub fn summary(&self) -> &Summary { &self.summary }
    pub fn progress(&self) -> Option<&ProgressState> { self.progress.as_ref() }
    pub fn toast(&self) -> Option<&Toast> { self.notifier.visible() }
    pub fn last_toast(&self) -> Option<&Toast> { self.notifier.last() }
    pub fn is_idle(&self) -> bool { self.in_flight == 0 }

    fn spawn_task<F>(&mut self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.updates_tx.clone();
        debug!(task = name, in_flight = self.in_flight, "task: spawn");
        tokio::spawn(async move {
            let mut guard = TaskGuard { name, tx, clean: false };
            fut.await;
            guard.clean = true;
        });
    }

    /// A task went away without finishing its work.
    fn task_abandoned(&mut self, name: &'static str) {
        metrics::counter!("crm_tasks_abandoned_total", 1, "task" => name);
        warn!(task = name, in_flight = self.in_flight, "task: ended without completing");
        if name == BULK_TASK {
            if let Some(p) = self.progress.take() {
                self.notifier.show(format!("{}: task aborted", p.failure_prefix), Severity::Error);
                return;
            }
        }
        self.notifier.show(format!("Background task {name} failed"), Severity::Error);
    }

    fn reload(&mut self, r: Reloads) {
        if r.users {
            self.start_load_users();
        }
        if r.emails {
            self.start_load_emails();
        }
        if r.summary {
            self.start_summary_tasks();
        }
    }

    /// Apply one update from a background task.
    pub fn apply(&mut self, update: UiUpdate) {
        self.notifier.expire();
        match update {
            UiUpdate::UsersLoaded(items) => {
                let epoch = self.users.replace(items);
                self.users_status = LoadStatus::Loaded;
                debug!(epoch, "ui: users applied");
            }
            UiUpdate::EmailsLoaded(items) => {
                let epoch = self.emails.replace(items);
                self.emails_status = LoadStatus::Loaded;
                debug!(epoch, "ui: emails applied");
            }
            UiUpdate::LoadFailed { collection, message } => match collection {
                crm_core::Collection::Users => self.users_status = LoadStatus::Failed(message),
                crm_core::Collection::Emails => self.emails_status = LoadStatus::Failed(message),
            },
            UiUpdate::SummaryUsers(n) => self.summary.users = Some(n),
            UiUpdate::SummaryEmails { count, providers } => {
                self.summary.emails = Some(count);
                self.summary.providers = Some(providers);
            }
            UiUpdate::Mutation { what, result } => self.finish_mutation(what, result),
            UiUpdate::Progress { op, percent, label } => match self.progress.as_mut() {
                Some(p) if p.op == op => {
                    p.percent = percent;
                    p.label = label;
                }
                _ => debug!(op = %op, percent, "ui: stale progress ignored"),
            },
            UiUpdate::BulkFinished { op, result } => self.finish_bulk(op, result),
            UiUpdate::TaskEnded { name, clean } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if clean {
                    debug!(task = name, in_flight = self.in_flight, "task: ended");
                } else {
                    self.task_abandoned(name);
                }
            }
        }
    }

    /// Wait for and apply the next update. Returns `false` once nothing is in
    /// flight and the queue is drained.
    pub async fn step(&mut self) -> bool {
        if self.in_flight == 0 {
            return match self.updates_rx.try_recv() {
                Ok(u) => {
                    self.apply(u);
                    true
                }
                Err(_) => false,
            };
        }
        match self.updates_rx.recv().await {
            Some(u) => {
                self.apply(u);
                true
            }
            None => false,
        }
    }

    pub async fn run_until_idle(&mut self) {
        while self.step().await {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_api::MockApi;
    use uuid::Uuid;

    fn console() -> Console {
        Console::new(Arc::new(MockApi::new()), DashboardConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_task_still_releases_its_slot() {
        let mut c = console();
        c.spawn_task("load.users", async {
            panic!("decoder blew up");
        });
        assert!(!c.is_idle());
        c.run_until_idle().await;
        assert!(c.is_idle());
        let toast = c.last_toast().expect("toast");
        assert_eq!(toast.severity, Severity::Error);
        assert_eq!(toast.text, "Background task load.users failed");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_bulk_task_closes_the_surface() {
        let mut c = console();
        c.progress = Some(ProgressState {
            op: Uuid::new_v4(),
            title: "Generating random users",
            percent: 40,
            label: LABEL_GENERATING,
            failure_prefix: "Error generating users",
        });
        c.spawn_task(BULK_TASK, async {
            panic!("generator crashed");
        });
        c.run_until_idle().await;
        assert!(c.is_idle());
        assert!(c.progress().is_none());
        assert_eq!(c.last_toast().map(|t| t.text.as_str()), Some("Error generating users: task aborted"));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_task_ends_quietly() {
        let mut c = console();
        c.spawn_task("summary.users", async {});
        c.run_until_idle().await;
        assert!(c.is_idle());
        assert!(c.last_toast().is_none());
    }
}
