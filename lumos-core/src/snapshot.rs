//! Normalized show-controller status snapshots.
//!
//! The controller (and the relay in front of it) returns loosely typed JSON.
//! Every field is optional and untrusted: anything missing or malformed is
//! mapped to "unknown" instead of failing the whole snapshot.

use crate::error::Result;
use crate::time::duration_from_secs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Timestamps above this are assumed to be milliseconds rather than seconds.
const MILLIS_TIMESTAMP_THRESHOLD: f64 = 100_000_000_000.0;

/// Playback state reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    Playing,
    Idle,
    #[default]
    Unknown,
}

impl PlayState {
    /// Parse a controller status name such as `"playing"` or `"idle"`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "playing" => Self::Playing,
            "idle" | "stopped" => Self::Idle,
            _ => Self::Unknown,
        }
    }

    /// Parse the numeric `status` code (`0` idle, `1` playing).
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Playing,
            0 => Self::Idle,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Idle => "idle",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fetched status payload, valid until superseded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalSnapshot {
    pub play_state: PlayState,
    /// Raw name of the sequence or playlist entry currently running
    pub current_item: Option<String>,
    /// Time played in the current item
    pub elapsed: Option<Duration>,
    /// Time left in the current item
    pub remaining: Option<Duration>,
    /// Raw name of the next scheduled playlist
    pub next_item: Option<String>,
    /// When the next scheduled playlist starts
    pub next_start: Option<DateTime<Utc>>,
}

impl ExternalSnapshot {
    #[must_use]
    pub fn new(play_state: PlayState) -> Self {
        Self {
            play_state,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_current_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, elapsed: Duration, remaining: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self.remaining = Some(remaining);
        self
    }

    #[must_use]
    pub fn with_next_item(mut self, item: impl Into<String>) -> Self {
        self.next_item = Some(item.into());
        self
    }

    #[must_use]
    pub const fn with_next_start(mut self, start: DateTime<Utc>) -> Self {
        self.next_start = Some(start);
        self
    }

    /// Parse a raw status body.
    ///
    /// # Errors
    ///
    /// Returns an error only if the body is not JSON at all. Malformed fields
    /// inside valid JSON never fail.
    pub fn from_status_str(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_status_json(&value))
    }

    /// Normalize a status payload.
    #[must_use]
    pub fn from_status_json(status: &Value) -> Self {
        let mut play_state = play_state_of(status);

        let mut seconds = |key: &str| match seconds_field(status.get(key)) {
            Seconds::Absent => None,
            Seconds::Valid(duration) => Some(duration),
            Seconds::Malformed => {
                play_state = PlayState::Unknown;
                None
            }
        };
        let elapsed = seconds("seconds_played");
        let remaining = seconds("seconds_remaining");

        let current_item = text_field(status.get("current_sequence")).or_else(|| {
            text_field(status.get("current_playlist").and_then(|p| p.get("description")))
        });

        let next = status.get("scheduler").and_then(|s| s.get("nextPlaylist"));
        let next_item = text_field(next.and_then(|n| n.get("playlistName")));
        let next_start = next
            .and_then(|n| n.get("scheduledStartTime"))
            .and_then(timestamp_field);

        Self {
            play_state,
            current_item,
            elapsed,
            remaining,
            next_item,
            next_start,
        }
    }
}

/// Extract the `error` field a relay adds to placeholder payloads.
#[must_use]
pub fn relay_error(status: &Value) -> Option<String> {
    match status.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn play_state_of(status: &Value) -> PlayState {
    let by_name = status
        .get("status_name")
        .and_then(Value::as_str)
        .map_or(PlayState::Unknown, PlayState::from_name);
    if by_name.is_known() {
        return by_name;
    }

    match status.get("status") {
        Some(Value::Number(code)) => code.as_i64().map_or(PlayState::Unknown, PlayState::from_code),
        Some(Value::String(name)) => PlayState::from_name(name),
        _ => PlayState::Unknown,
    }
}

enum Seconds {
    Absent,
    Valid(Duration),
    Malformed,
}

fn seconds_field(value: Option<&Value>) -> Seconds {
    let secs = match value {
        None | Some(Value::Null) => return Seconds::Absent,
        Some(Value::String(s)) if s.trim().is_empty() => return Seconds::Absent,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    secs.and_then(duration_from_secs)
        .map_or(Seconds::Malformed, Seconds::Valid)
}

fn text_field(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

// Values are bounded by the checks below and chrono rejects out-of-range results
#[allow(clippy::cast_possible_truncation)]
fn timestamp_field(value: &Value) -> Option<DateTime<Utc>> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => {
                return DateTime::parse_from_rfc3339(s.trim())
                    .ok()
                    .map(|d| d.with_timezone(&Utc));
            }
        },
        _ => return None,
    };

    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }

    if raw >= MILLIS_TIMESTAMP_THRESHOLD {
        DateTime::from_timestamp_millis(raw as i64)
    } else {
        DateTime::from_timestamp(raw as i64, 0)
    }
}
