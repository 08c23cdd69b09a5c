//! Seasonal show schedule.
//!
//! The schedule is a small compiled-in table: which season is active for a
//! given calendar date, and during which hours a show is expected to run.

use chrono::{DateTime, Datelike, Month, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// The calendar season a schedule rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Halloween,
    Christmas,
    #[serde(rename = "none")]
    OffSeason,
}

impl Season {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Halloween => "halloween",
            Self::Christmas => "christmas",
            Self::OffSeason => "none",
        }
    }

    /// The visual theme used for this season.
    #[must_use]
    pub const fn theme(&self) -> Theme {
        match self {
            Self::Halloween => Theme::Halloween,
            Self::Christmas => Theme::Christmas,
            Self::OffSeason => Theme::Default,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual theme of the status widget. Every season maps to exactly one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Halloween,
    Christmas,
    Default,
}

impl Theme {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Halloween => "halloween",
            Self::Christmas => "christmas",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Daily hour range during which a show runs. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourWindow {
    #[must_use]
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour <= self.end_hour
    }
}

/// One row of the seasonal schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleRule {
    pub season: Season,
    /// Name shown in the widget header
    pub display_name: &'static str,
    /// Month (1-12) in which the rule is active; `None` for the off-season rule
    pub month: Option<u32>,
    /// Last day of the month on which the rule is still active
    pub last_day: Option<u32>,
    /// Nightly show hours; `None` means no show is ever scheduled
    pub window: Option<HourWindow>,
}

impl ScheduleRule {
    /// Whether this rule covers the given calendar date.
    #[must_use]
    pub fn matches(&self, month: u32, day: u32) -> bool {
        self.month == Some(month) && self.last_day.map_or(true, |last| day <= last)
    }

    /// Whether `hour` falls inside this rule's show window.
    #[must_use]
    pub fn in_window(&self, hour: u32) -> bool {
        self.window.is_some_and(|w| w.contains(hour))
    }

    #[must_use]
    pub const fn is_off_season(&self) -> bool {
        matches!(self.season, Season::OffSeason)
    }

    /// English month name of the month this rule starts in.
    #[must_use]
    pub fn month_name(&self) -> Option<&'static str> {
        let month = u8::try_from(self.month?).ok()?;
        Month::try_from(month).ok().map(|m| m.name())
    }
}

pub const HALLOWEEN: ScheduleRule = ScheduleRule {
    season: Season::Halloween,
    display_name: "Halloween Show",
    month: Some(10),
    last_day: None,
    window: Some(HourWindow::new(18, 22)),
};

pub const CHRISTMAS: ScheduleRule = ScheduleRule {
    season: Season::Christmas,
    display_name: "Julshow",
    month: Some(12),
    last_day: Some(25),
    window: Some(HourWindow::new(17, 23)),
};

pub const OFF_SEASON: ScheduleRule = ScheduleRule {
    season: Season::OffSeason,
    display_name: "Ljusshower",
    month: None,
    last_day: None,
    window: None,
};

const DEFAULT_SEASONS: &[ScheduleRule] = &[HALLOWEEN, CHRISTMAS];

/// The full schedule: mutually exclusive seasonal rules plus the off-season fallback.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleTable {
    seasons: &'static [ScheduleRule],
    off_season: ScheduleRule,
}

impl ScheduleTable {
    #[must_use]
    pub const fn new(seasons: &'static [ScheduleRule], off_season: ScheduleRule) -> Self {
        Self {
            seasons,
            off_season,
        }
    }

    #[must_use]
    pub const fn seasons(&self) -> &'static [ScheduleRule] {
        self.seasons
    }

    #[must_use]
    pub const fn off_season(&self) -> &ScheduleRule {
        &self.off_season
    }

    /// The rule active at `now`, read in `now`'s time zone.
    #[must_use]
    pub fn active_rule<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> &ScheduleRule {
        let (month, day) = (now.month(), now.day());
        self.seasons
            .iter()
            .find(|rule| rule.matches(month, day))
            .unwrap_or(&self.off_season)
    }

    /// Whether a show is scheduled to be running at `now`.
    #[must_use]
    pub fn is_show_window<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.active_rule(now).in_window(now.hour())
    }

    /// The next seasonal rule to start after `now`'s month, wrapping into next year.
    #[must_use]
    pub fn next_season<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<&ScheduleRule> {
        let current = now.month();
        self.seasons
            .iter()
            .filter_map(|rule| rule.month.map(|m| (rule, months_until(current, m))))
            .min_by_key(|(_, distance)| *distance)
            .map(|(rule, _)| rule)
    }
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self::new(DEFAULT_SEASONS, OFF_SEASON)
    }
}

/// Months from `from` until `to`, where the same month counts as a full year away.
fn months_until(from: u32, to: u32) -> u32 {
    match (to + 12 - from) % 12 {
        0 => 12,
        n => n,
    }
}
