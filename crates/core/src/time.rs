#![forbid(unsafe_code)]

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a backend creation timestamp.
///
/// Accepts RFC 2822 (`Tue, 14 Oct 2025 10:00:00 GMT`, the backend's JSON encoding),
/// RFC 3339, and zone-less `YYYY-MM-DD HH:MM:SS` which is taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|n| Utc.from_utc_datetime(&n))
}

/// Milliseconds since the epoch used for ordering; absent timestamps order as the epoch.
pub fn sort_ts(ts: Option<&DateTime<Utc>>) -> i64 {
    ts.map(|t| t.timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_formats() {
        let want = 1_760_436_000;
        assert_eq!(parse_timestamp("Tue, 14 Oct 2025 10:00:00 GMT").map(|t| t.timestamp()), Some(want));
        assert_eq!(parse_timestamp("2025-10-14T10:00:00Z").map(|t| t.timestamp()), Some(want));
        assert_eq!(parse_timestamp("2025-10-14T12:00:00+02:00").map(|t| t.timestamp()), Some(want));
        assert_eq!(parse_timestamp("2025-10-14 10:00:00").map(|t| t.timestamp()), Some(want));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn missing_sorts_as_epoch() {
        assert_eq!(sort_ts(None), 0);
    }
}
