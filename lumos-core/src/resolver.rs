//! Show status resolution.
//!
//! [`resolve`] reconciles the most recent controller snapshot with the wall
//! clock and the seasonal schedule. The rule for the live flag is snapshot
//! precedence: a snapshot with a known play state is trusted as-is, and the
//! schedule window is only consulted when there is no snapshot or its state is
//! unknown. The off-season rule has no window, so it is never live on fallback.

use crate::countdown::format_countdown;
use crate::names::format_sequence_name;
use crate::schedule::{ScheduleRule, ScheduleTable, Theme};
use crate::snapshot::{ExternalSnapshot, PlayState};
use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Shown when the controller reports playing but names no sequence.
pub const PLAYING_PLACEHOLDER: &str = "Playing now";
/// Shown inside the show window when the controller cannot confirm what is playing.
pub const SCHEDULED_PLACEHOLDER: &str = "Show scheduled now";
/// Shown in season when no show is running.
pub const OFF_AIR_PLACEHOLDER: &str = "Inte på luften";
/// Shown outside every season.
pub const OFF_SEASON_PLACEHOLDER: &str = "Inte säsong";

/// Everything the status widget renders for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowViewModel {
    pub display_name: String,
    pub theme: Theme,
    pub is_live: bool,
    pub current_sequence: String,
    pub next_show: String,
    /// Progress through the current sequence, 0-100
    pub progress_percent: Option<f64>,
    pub seconds_remaining: Option<u64>,
}

/// Build the view model for `now` from the latest snapshot (if any).
///
/// Never fails: every field has a fallback when the snapshot is missing,
/// partial or in an unknown state.
#[must_use]
pub fn resolve<Tz: TimeZone>(
    now: &DateTime<Tz>,
    snapshot: Option<&ExternalSnapshot>,
    table: &ScheduleTable,
) -> ShowViewModel {
    let rule = table.active_rule(now);
    let in_window = table.is_show_window(now);

    let confirmed = snapshot.filter(|s| s.play_state.is_known());
    let is_live = confirmed.map_or(in_window, |s| s.play_state == PlayState::Playing);

    let current_sequence = if is_live {
        match snapshot.and_then(|s| s.current_item.as_deref()) {
            Some(item) => format_sequence_name(item),
            None if confirmed.is_some() => PLAYING_PLACEHOLDER.to_string(),
            None => SCHEDULED_PLACEHOLDER.to_string(),
        }
    } else if rule.is_off_season() {
        OFF_SEASON_PLACEHOLDER.to_string()
    } else {
        OFF_AIR_PLACEHOLDER.to_string()
    };

    let (progress_percent, seconds_remaining) = if is_live {
        snapshot.and_then(progress).unzip()
    } else {
        (None, None)
    };

    ShowViewModel {
        display_name: rule.display_name.to_string(),
        theme: rule.season.theme(),
        is_live,
        current_sequence,
        next_show: next_show_label(now, snapshot, rule, table, in_window),
        progress_percent,
        seconds_remaining,
    }
}

/// Progress percentage and whole seconds remaining, when both positions are known.
fn progress(snapshot: &ExternalSnapshot) -> Option<(f64, u64)> {
    let (elapsed, remaining) = (snapshot.elapsed?, snapshot.remaining?);
    let total = elapsed.as_secs_f64() + remaining.as_secs_f64();
    let percent = if total > 0.0 {
        (elapsed.as_secs_f64() / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    Some((percent, remaining.as_secs()))
}

fn next_show_label<Tz: TimeZone>(
    now: &DateTime<Tz>,
    snapshot: Option<&ExternalSnapshot>,
    rule: &ScheduleRule,
    table: &ScheduleTable,
    in_window: bool,
) -> String {
    if let Some(name) = snapshot.and_then(|s| s.next_item.as_deref()) {
        return format!("Next: {}", format_sequence_name(name));
    }

    if let Some(start) = snapshot.and_then(|s| s.next_start) {
        let countdown = format_countdown(now, &start);
        if !countdown.is_empty() {
            return format!("Next show in {countdown}");
        }
    }

    schedule_message(now, rule, table, in_window)
}

/// Static message derived from the schedule alone.
fn schedule_message<Tz: TimeZone>(
    now: &DateTime<Tz>,
    rule: &ScheduleRule,
    table: &ScheduleTable,
    in_window: bool,
) -> String {
    match rule.window {
        Some(window) if in_window => format!(
            "Shows tonight {:02}:00–{:02}:59",
            window.start_hour, window.end_hour
        ),
        Some(window) => format!("Next show at {:02}:00", window.start_hour),
        None => table
            .next_season(now)
            .and_then(|next| {
                next.month_name()
                    .map(|month| format!("Next season: {} begins in {month}", next.display_name))
            })
            .unwrap_or_else(|| "No shows scheduled".to_string()),
    }
}
