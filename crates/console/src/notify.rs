#![forbid(unsafe_code)]

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

/// Fixed presentation of one severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastStyle {
    pub icon: &'static str,
    pub color: &'static str,
}

impl Severity {
    pub fn style(self) -> ToastStyle {
        match self {
            Severity::Success => ToastStyle { icon: "check_circle", color: "green" },
            Severity::Error => ToastStyle { icon: "error", color: "red" },
            Severity::Info => ToastStyle { icon: "info", color: "blue" },
            Severity::Warning => ToastStyle { icon: "warning", color: "yellow" },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub text: String,
    pub severity: Severity,
    /// Bumped on every show, so a front end can tell a replacement from the same toast.
    pub seq: u64,
    #[serde(skip)]
    pub shown_at: Instant,
}

/// Single-slot notification surface: showing a toast replaces whatever is
/// visible and restarts the dismissal clock.
#[derive(Debug)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Toast>,
    seq: u64,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None, seq: 0 }
    }

    pub fn show(&mut self, text: impl Into<String>, severity: Severity) {
        self.seq += 1;
        let text = text.into();
        match severity {
            Severity::Error | Severity::Warning => tracing::warn!(severity = %severity, text = %text, "toast"),
            _ => tracing::info!(severity = %severity, text = %text, "toast"),
        }
        self.current = Some(Toast { text, severity, seq: self.seq, shown_at: Instant::now() });
    }

    /// The visible toast, if it has not outlived its display time.
    pub fn visible(&self) -> Option<&Toast> {
        self.visible_at(Instant::now())
    }

    pub fn visible_at(&self, now: Instant) -> Option<&Toast> {
        self.current.as_ref().filter(|t| now.duration_since(t.shown_at) < self.ttl)
    }

    /// Drop the toast once its time is up.
    pub fn expire(&mut self) {
        let now = Instant::now();
        if self.visible_at(now).is_none() {
            self.current = None;
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Most recent toast regardless of expiry.
    pub fn last(&self) -> Option<&Toast> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn replacement_restarts_clock() {
        let mut n = Notifier::new(Duration::from_millis(5000));
        n.show("first", Severity::Info);
        tokio::time::advance(Duration::from_millis(4000)).await;
        n.show("second", Severity::Error);
        assert_eq!(n.visible().map(|t| t.text.as_str()), Some("second"));
        tokio::time::advance(Duration::from_millis(4000)).await;
        // 8s after the first, 4s after the second: still up.
        assert_eq!(n.visible().map(|t| t.seq), Some(2));
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(n.visible().is_none());
        n.expire();
        assert!(n.last().is_none());
    }

    #[test]
    fn severities_have_fixed_styles() {
        assert_eq!(Severity::Success.style().icon, "check_circle");
        assert_eq!(Severity::Error.style().color, "red");
        assert_eq!(Severity::Warning.style().icon, "warning");
        assert_eq!(Severity::Info.style().color, "blue");
    }
}
