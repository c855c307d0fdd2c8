#![forbid(unsafe_code)]

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::config::ProgressConfig;
use crate::model::{UiUpdate, LABEL_GENERATING};

/// Simulated progress for one bulk operation.
///
/// Emits `Progress` updates every tick, `step` points at a time, and stops
/// advancing at `cap`. Only the owner of the handle can stop it, and stopping
/// consumes the handle, so a ticker is cancelled at most once. Dropping the
/// handle aborts the task as well.
pub struct ProgressTicker {
    op: Uuid,
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn start(op: Uuid, cfg: ProgressConfig, tx: UnboundedSender<UiUpdate>) -> Self {
        let task = tokio::spawn(async move {
            let mut percent: u8 = 0;
            while percent < cfg.cap {
                tokio::time::sleep(cfg.tick).await;
                percent = percent.saturating_add(cfg.step).min(cfg.cap);
                debug!(op = %op, percent, "progress: tick");
                if tx.send(UiUpdate::Progress { op, percent, label: LABEL_GENERATING }).is_err() {
                    break;
                }
            }
        });
        Self { op, task: Some(task) }
    }

    /// Abort and wait until the task is gone; no tick is sent after this returns.
    pub async fn stop(mut self) {
        if let Some(h) = self.task.take() {
            h.abort();
            let _ = h.await;
        }
        debug!(op = %self.op, "progress: ticker stopped");
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(h) = self.task.take() {
            h.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn percents(rx: &mut mpsc::UnboundedReceiver<UiUpdate>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(u) = rx.try_recv() {
            if let UiUpdate::Progress { percent, .. } = u {
                out.push(percent);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn climbs_to_cap_and_stays() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = ProgressTicker::start(Uuid::new_v4(), ProgressConfig::default(), tx);
        tokio::time::sleep(Duration::from_secs(10)).await;
        let seen = percents(&mut rx);
        assert_eq!(seen.len(), 18);
        assert_eq!(seen.first(), Some(&5));
        assert_eq!(seen.last(), Some(&90));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_silences_ticker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = ProgressTicker::start(Uuid::new_v4(), ProgressConfig::default(), tx);
        tokio::time::sleep(Duration::from_millis(650)).await;
        ticker.stop().await;
        let before = percents(&mut rx);
        assert_eq!(before, vec![5, 10, 15]);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(percents(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_aborts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(ProgressTicker::start(Uuid::new_v4(), ProgressConfig::default(), tx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(percents(&mut rx).is_empty());
        // Sender went away with the task.
        assert!(rx.recv().await.is_none());
    }
}
