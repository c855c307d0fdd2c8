#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use crm_api::{ApiError, CrmApi};
use crm_core::validate_bulk_count;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProgressConfig;
use crate::model::{BulkKind, BulkOutcome, ProgressState, UiUpdate, LABEL_COMPLETED, LABEL_STARTING};
use crate::notify::Severity;
use crate::progress::ProgressTicker;
use crate::{Console, BULK_TASK};

impl Console {
    /// Open the progress surface and run one generation request under it.
    pub(crate) fn start_bulk(&mut self, kind: BulkKind) {
        if let Some(p) = &self.progress {
            warn!(running = %p.op, requested = kind.as_str(), "bulk: refused, another generation is running");
            self.notifier.show("A generation is already in progress", Severity::Warning);
            return;
        }
        if let BulkKind::Users { count } = kind {
            if let Err(e) = validate_bulk_count(count, self.cfg.max_bulk_users) {
                metrics::counter!("crm_bulk_ops_total", 1, "kind" => "users", "outcome" => "rejected");
                self.notifier.show(e.to_string(), Severity::Error);
                return;
            }
        }
        let op = Uuid::new_v4();
        self.progress = Some(ProgressState {
            op,
            title: kind.title(),
            percent: 0,
            label: LABEL_STARTING,
            failure_prefix: kind.failure_prefix(),
        });
        info!(op = %op, kind = kind.as_str(), "bulk: start");
        let api = self.api.clone();
        let tx = self.updates_tx.clone();
        let cfg = self.cfg.progress;
        self.spawn_task(BULK_TASK, run_bulk(api, kind, op, cfg, tx));
    }

    pub(crate) fn finish_bulk(&mut self, op: Uuid, result: Result<BulkOutcome, ApiError>) {
        let surface = match self.progress.take() {
            Some(p) if p.op == op => p,
            other => {
                self.progress = other;
                debug!(op = %op, "bulk: stale completion ignored");
                return;
            }
        };
        match result {
            Ok(outcome) => {
                self.reload(outcome.reloads());
                self.notifier.show(outcome.success_text(), Severity::Success);
            }
            Err(e) => {
                self.notifier.show(format!("{}: {}", surface.failure_prefix, e.message()), Severity::Error)
            }
        }
    }
}

/// Request and ticker race; the ticker is stopped and joined before the
/// completed state is published, so no tick can land after it.
async fn run_bulk(api: Arc<dyn CrmApi>, kind: BulkKind, op: Uuid, cfg: ProgressConfig, tx: UnboundedSender<UiUpdate>) {
    let t0 = Instant::now();
    let ticker = ProgressTicker::start(op, cfg, tx.clone());
    let result = match &kind {
        BulkKind::Users { count } => {
            api.generate_users(*count).await.map(|r| BulkOutcome::Users { generated: r.users.len() })
        }
        BulkKind::Emails(scope) => api.generate_emails(scope.clone()).await.map(|r| BulkOutcome::Emails {
            generated: r.emails.len(),
            scope: scope.label(),
            elapsed_secs: r.elapsed_secs,
        }),
    };
    ticker.stop().await;
    let took_ms = t0.elapsed().as_millis();
    match result {
        Ok(outcome) => {
            metrics::counter!("crm_bulk_ops_total", 1, "kind" => kind.as_str(), "outcome" => "ok");
            info!(op = %op, kind = kind.as_str(), took_ms = %took_ms, "bulk: ok");
            let _ = tx.send(UiUpdate::Progress { op, percent: 100, label: LABEL_COMPLETED });
            tokio::time::sleep(cfg.settle).await;
            let _ = tx.send(UiUpdate::BulkFinished { op, result: Ok(outcome) });
        }
        Err(e) => {
            metrics::counter!("crm_bulk_ops_total", 1, "kind" => kind.as_str(), "outcome" => e.kind());
            warn!(op = %op, kind = kind.as_str(), took_ms = %took_ms, error = %e, "bulk: failed");
            let _ = tx.send(UiUpdate::BulkFinished { op, result: Err(e) });
        }
    }
}
