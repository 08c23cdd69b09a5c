//! The controller's playlist schedule.
//!
//! FPP returns its schedule as a JSON array of entries with a playlist name,
//! a start date and a daily start/end time. Only enabled entries are kept.
//! Times carry no zone; they are read as wall-clock time in the zone of the
//! `now` they are compared against.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const LOG_TARGET: &str = "lumos::playlists";

/// One enabled schedule entry with resolved start and end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub playlist: String,
    pub start: NaiveDateTime,
    /// Later than `start`; an end time before the start time runs past midnight
    pub end: NaiveDateTime,
}

/// Where an entry stands relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Current,
    Upcoming,
    Past,
}

/// An entry classified against a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledPlaylist {
    pub playlist: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: EntryStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default)]
    playlist: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    end_time: String,
    #[serde(default)]
    enabled: Value,
}

impl RawEntry {
    fn is_enabled(&self) -> bool {
        self.enabled.as_i64() == Some(1)
    }

    fn resolve(self) -> Option<PlaylistEntry> {
        let date = NaiveDate::parse_from_str(self.start_date.trim(), "%Y-%m-%d").ok()?;
        let start = date.and_time(parse_time(&self.start_time)?);
        let mut end = date.and_time(parse_time(&self.end_time)?);
        if end < start {
            end += Duration::days(1);
        }

        Some(PlaylistEntry {
            playlist: self.playlist,
            start,
            end,
        })
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Parse the controller's schedule payload.
///
/// Returns `None` when the payload is not an array. Disabled entries and
/// entries whose date or times can't be read are dropped.
#[must_use]
pub fn parse_playlist_schedule(value: &Value) -> Option<Vec<PlaylistEntry>> {
    let items = value.as_array()?;

    let entries = items
        .iter()
        .filter_map(|item| {
            let raw: RawEntry = serde_json::from_value(item.clone()).ok()?;
            if !raw.is_enabled() {
                return None;
            }
            let playlist = raw.playlist.clone();
            let entry = raw.resolve();
            if entry.is_none() {
                debug!(target: LOG_TARGET, "Skipping schedule entry {}: unreadable date or time", playlist);
            }
            entry
        })
        .collect();

    Some(entries)
}

impl PlaylistEntry {
    /// Current from start through end inclusive, upcoming before the start.
    #[must_use]
    pub fn status_at(&self, now: NaiveDateTime) -> EntryStatus {
        if self.start <= now && now <= self.end {
            EntryStatus::Current
        } else if self.start > now {
            EntryStatus::Upcoming
        } else {
            EntryStatus::Past
        }
    }
}

/// Classify every entry against `now`, keeping the controller's order.
#[must_use]
pub fn classify<Tz: TimeZone>(entries: &[PlaylistEntry], now: &DateTime<Tz>) -> Vec<ScheduledPlaylist> {
    let now = now.naive_local();
    entries
        .iter()
        .map(|entry| ScheduledPlaylist {
            playlist: entry.playlist.clone(),
            start: entry.start,
            end: entry.end,
            status: entry.status_at(now),
        })
        .collect()
}

/// The last schedule fetched from the controller
#[derive(Debug, Clone)]
pub struct PlaylistSchedule {
    pub entries: Vec<PlaylistEntry>,
    pub fetched_at: DateTime<Utc>,
}

/// Shared holder of the latest playlist schedule.
///
/// A failed refresh leaves the previous schedule in place.
#[derive(Debug, Default)]
pub struct PlaylistCache {
    inner: RwLock<Option<PlaylistSchedule>>,
}

impl PlaylistCache {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn store(&self, entries: Vec<PlaylistEntry>) {
        self.store_at(entries, Utc::now()).await;
    }

    pub async fn store_at(&self, entries: Vec<PlaylistEntry>, fetched_at: DateTime<Utc>) {
        *self.inner.write().await = Some(PlaylistSchedule {
            entries,
            fetched_at,
        });
    }

    /// `None` until the first successful fetch
    pub async fn latest(&self) -> Option<PlaylistSchedule> {
        self.inner.read().await.clone()
    }
}
