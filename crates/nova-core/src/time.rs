//! Millisecond clock helpers (no chrono dependency).
//!
//! Engine rules take `now` as a parameter; only the host-facing layer reads
//! the wall clock through [`now_unix_millis`].

use std::time::{SystemTime, UNIX_EPOCH};

pub const MILLIS_PER_HOUR: u64 = 60 * 60 * 1000;

/// Current UTC time as Unix milliseconds.
pub fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Fractional hours elapsed from `since` to `now`. Zero if the clock went backwards.
pub fn hours_between(since: u64, now: u64) -> f64 {
    now.saturating_sub(since) as f64 / MILLIS_PER_HOUR as f64
}

/// Render Unix milliseconds as an ISO-8601 UTC string with millisecond precision.
pub fn iso8601(millis: u64) -> String {
    let secs = millis / 1000;
    let ms = millis % 1000;
    let days = (secs / 86_400) as i64;
    let tod = secs % 86_400;
    let (y, m, d) = civil_from_days(days);
    format!(
        "{y:04}-{m:02}-{d:02}T{:02}:{:02}:{:02}.{ms:03}Z",
        tod / 3600,
        (tod % 3600) / 60,
        tod % 60
    )
}

/// Howard Hinnant's civil_from_days: days since epoch → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe as i64 + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(iso8601(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_known_instant() {
        // 2026-02-21T00:00:00Z
        assert_eq!(iso8601(1_771_632_000_250), "2026-02-21T00:00:00.250Z");
    }

    #[test]
    fn test_hours_between() {
        assert_eq!(hours_between(0, 3 * MILLIS_PER_HOUR), 3.0);
        assert_eq!(hours_between(10, 5), 0.0);
    }
}
