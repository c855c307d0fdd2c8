#![forbid(unsafe_code)]

use std::time::Duration;

use crm_core::MAX_BULK_USERS;

/// Timing of the simulated progress shown while a bulk request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Percentage points added per tick.
    pub step: u8,
    pub tick: Duration,
    /// The ticker never goes past this on its own; only completion reaches 100.
    pub cap: u8,
    /// How long the completed state stays visible before the surface closes.
    pub settle: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { step: 5, tick: Duration::from_millis(200), cap: 90, settle: Duration::from_millis(500) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConfig {
    pub progress: ProgressConfig,
    pub toast_ttl: Duration,
    pub max_bulk_users: u32,
    pub quick_users: u32,
    pub default_bulk_users: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            progress: ProgressConfig::default(),
            toast_ttl: Duration::from_millis(5000),
            max_bulk_users: MAX_BULK_USERS,
            quick_users: 100,
            default_bulk_users: 1000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl DashboardConfig {
    /// Defaults overridden by `CRM_PROGRESS_*`, `CRM_TOAST_MS` and `CRM_MAX_BULK_USERS`.
    pub fn from_env() -> Self {
        let d = Self::default();
        let cap = env_parse::<u8>("CRM_PROGRESS_CAP").unwrap_or(d.progress.cap).min(99);
        let progress = ProgressConfig {
            step: env_parse::<u8>("CRM_PROGRESS_STEP").filter(|s| *s > 0).unwrap_or(d.progress.step),
            tick: env_parse::<u64>("CRM_PROGRESS_TICK_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(d.progress.tick),
            cap,
            settle: env_parse::<u64>("CRM_PROGRESS_SETTLE_MS").map(Duration::from_millis).unwrap_or(d.progress.settle),
        };
        Self {
            progress,
            toast_ttl: env_parse::<u64>("CRM_TOAST_MS").map(Duration::from_millis).unwrap_or(d.toast_ttl),
            max_bulk_users: env_parse::<u32>("CRM_MAX_BULK_USERS").unwrap_or(d.max_bulk_users),
            ..d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_timing() {
        let c = DashboardConfig::default();
        assert_eq!(c.progress.step, 5);
        assert_eq!(c.progress.tick, Duration::from_millis(200));
        assert_eq!(c.progress.cap, 90);
        assert_eq!(c.toast_ttl, Duration::from_secs(5));
        assert_eq!(c.max_bulk_users, 10_000);
        assert_eq!(c.quick_users, 100);
    }
}
