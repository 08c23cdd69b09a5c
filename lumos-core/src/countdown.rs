//! Human-readable countdowns to the next scheduled show.

use chrono::{DateTime, TimeZone};

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Format the time left from `now` until `target`, e.g. `"2d 3h 4m 5s"`.
///
/// Components are truncated, never rounded, and the days component is omitted
/// when zero. Returns an empty string when `target` is not in the future.
#[must_use]
pub fn format_countdown<Tz: TimeZone, Tz2: TimeZone>(
    now: &DateTime<Tz>,
    target: &DateTime<Tz2>,
) -> String {
    let diff = target.timestamp_millis().saturating_sub(now.timestamp_millis());
    if diff <= 0 {
        return String::new();
    }

    let days = diff / MS_PER_DAY;
    let hours = (diff % MS_PER_DAY) / MS_PER_HOUR;
    let minutes = (diff % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (diff % MS_PER_MINUTE) / MS_PER_SECOND;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else {
        format!("{hours}h {minutes}m {seconds}s")
    }
}
