//! Human-readable time labels for the device list and status bar.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Seconds between `then` and `now`, clamped to zero for clock skew.
fn age_secs(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().max(0)
}

/// "Updated 12s ago" style label for the last successful refresh.
pub fn format_updated_ago(last_update: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(then) = last_update else {
        return "Updated just now".into();
    };
    let secs = age_secs(then, now);
    if secs < MINUTE {
        format!("Updated {}s ago", secs.max(1))
    } else if secs < HOUR {
        format!("Updated {}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("Updated {}h ago", secs / HOUR)
    } else {
        format!("Updated {}d ago", secs / DAY)
    }
}

/// Presence label shown next to a device.
pub fn format_last_seen_label(
    online: bool,
    last_seen: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> String {
    if online {
        return "Active now".into();
    }
    let Some(then) = last_seen else {
        return "Never seen".into();
    };
    let secs = age_secs(then, now);
    if secs < HOUR {
        format!("{}m ago", (secs / MINUTE).max(1))
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < 2 * DAY {
        "Yesterday".into()
    } else {
        format!("{}d ago", secs / DAY)
    }
}

/// Local-time timestamp for detail views; `-` when absent.
pub fn format_exact_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || "-".into(),
        |ts| {
            ts.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

/// Same as [`format_exact_timestamp`] but for raw RFC 3339 strings, which
/// may be malformed.
pub fn format_exact_timestamp_str(value: Option<&str>) -> String {
    let parsed = value.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok());
    format_exact_timestamp(parsed.map(|ts| ts.with_timezone(&Utc)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn updated_ago_buckets() {
        let n = now();
        assert_eq!(format_updated_ago(None, n), "Updated just now");
        assert_eq!(format_updated_ago(Some(n), n), "Updated 1s ago");
        assert_eq!(format_updated_ago(Some(n - Duration::seconds(42)), n), "Updated 42s ago");
        assert_eq!(format_updated_ago(Some(n - Duration::minutes(5)), n), "Updated 5m ago");
        assert_eq!(format_updated_ago(Some(n - Duration::hours(3)), n), "Updated 3h ago");
        assert_eq!(format_updated_ago(Some(n - Duration::days(4)), n), "Updated 4d ago");
    }

    #[test]
    fn future_timestamps_clamp_to_zero() {
        let n = now();
        assert_eq!(format_updated_ago(Some(n + Duration::minutes(5)), n), "Updated 1s ago");
        assert_eq!(format_last_seen_label(false, Some(n + Duration::hours(1)), n), "1m ago");
    }

    #[test]
    fn last_seen_labels() {
        let n = now();
        assert_eq!(format_last_seen_label(true, None, n), "Active now");
        assert_eq!(format_last_seen_label(false, None, n), "Never seen");
        assert_eq!(format_last_seen_label(false, Some(n - Duration::seconds(10)), n), "1m ago");
        assert_eq!(format_last_seen_label(false, Some(n - Duration::minutes(59)), n), "59m ago");
        assert_eq!(format_last_seen_label(false, Some(n - Duration::hours(23)), n), "23h ago");
        assert_eq!(format_last_seen_label(false, Some(n - Duration::hours(30)), n), "Yesterday");
        assert_eq!(format_last_seen_label(false, Some(n - Duration::days(9)), n), "9d ago");
    }

    #[test]
    fn exact_timestamp_handles_missing_and_invalid() {
        assert_eq!(format_exact_timestamp(None), "-");
        assert_eq!(format_exact_timestamp_str(Some("yesterday-ish")), "-");
        assert_ne!(format_exact_timestamp_str(Some("2026-03-01T12:00:00Z")), "-");
    }
}
