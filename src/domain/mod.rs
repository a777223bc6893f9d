//! Entities shared across the engine. Habits carry two cached derived fields
//! (current streak and last-completed day) that must always equal what
//! [streak::recompute](crate::streak::recompute) yields from the habit's full
//! completion history.

use std::{fmt::Display, str::FromStr, sync::Arc};

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REMINDER_TIME: &str = "21:00";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(Arc<str>);

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Arc<str>);

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Arc<str>);

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-clock reminder time. Habits store the raw `HH:MM` string the user
/// entered; parsing happens where the value is consumed so a malformed time
/// skips one habit instead of failing a whole scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    pub fn new_opt(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// True when `time` falls inside this reminder's minute.
    pub fn matches(&self, time: NaiveTime) -> bool {
        time.hour() == self.hour && time.minute() == self.minute
    }
}

impl FromStr for ReminderTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Reminder time {s:?} is not in HH:MM form"))?;
        let hour = hour.parse::<u32>()?;
        let minute = minute.parse::<u32>()?;
        ReminderTime::new_opt(hour, minute)
            .ok_or_else(|| anyhow!("Reminder time {s:?} is out of range"))
    }
}

impl Display for ReminderTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// How often a habit is meant to be completed. Due-ness is always the
/// calendar-day rule; the cadence is carried for display and future use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub name: Arc<str>,
    #[serde(default)]
    pub description: Option<Arc<str>>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_reminder_time")]
    pub reminder_time: Arc<str>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Cached: equals the last streak value derivable from the event history.
    #[serde(default)]
    pub streak_count: u32,
    /// Cached: calendar day of the most recent completion.
    #[serde(default)]
    pub last_completed: Option<NaiveDate>,
}

fn default_reminder_time() -> Arc<str> {
    DEFAULT_REMINDER_TIME.into()
}

fn default_true() -> bool {
    true
}

/// Represents a single habit completion at a point in time. Immutable once
/// logged; removing one invalidates the owning habit's cached fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub id: EventId,
    pub habit_id: HabitId,
    pub user_id: UserId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<Arc<str>>,
}

impl CompletionEvent {
    /// Calendar day of the completion. Streak arithmetic never looks at the
    /// time of day.
    pub fn day(&self) -> NaiveDate {
        self.completed_at.date_naive()
    }
}

/// Delivery channels a notification can go out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Email,
    InApp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default = "default_true", rename = "inApp")]
    pub in_app: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            in_app: true,
        }
    }
}

impl NotificationPrefs {
    pub fn enabled(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Email => self.email,
            ChannelKind::InApp => self.in_app,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: Arc<str>,
    pub email: Arc<str>,
    #[serde(default)]
    pub prefs: NotificationPrefs,
}

/// Message produced once per (habit, tick) for a due habit, handed to every
/// channel the owning user has enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueNotification {
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub streak_count: u32,
    pub habit_name: Arc<str>,
}
