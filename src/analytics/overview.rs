//! Per-habit streak summaries over a trailing window, the payload behind the
//! streaks endpoint of the hosting API.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::{
    domain::{CompletionEvent, Habit, HabitId, UserId},
    store::{EventLog, HabitStore},
    streak::{self, due::is_due},
};

/// Window for the all-habits summary list.
pub const WEEKLY_WINDOW_DAYS: u32 = 7;
/// Window for the single-habit detail view.
pub const MONTHLY_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakOverview {
    pub habit_id: HabitId,
    pub name: Arc<str>,
    /// The cached running streak, not bounded by the window.
    pub current_streak: u32,
    /// Longest streak whose completions all fall inside the window.
    pub longest_streak: u32,
    pub last_completed: Option<NaiveDate>,
    /// Events in window over window length, as a percentage. Multiple
    /// completions on one day can push this past 100.
    pub completion_rate: f64,
    pub is_due_today: bool,
}

/// Summarizes one habit from its events inside the trailing window.
pub fn streak_overview(
    habit: &Habit,
    recent_events: &[CompletionEvent],
    today: NaiveDate,
    window_days: u32,
) -> StreakOverview {
    let trajectory = streak::recompute(recent_events);
    let longest_streak = trajectory.iter().map(|p| p.streak).max().unwrap_or(0);

    StreakOverview {
        habit_id: habit.id.clone(),
        name: habit.name.clone(),
        current_streak: habit.streak_count,
        longest_streak,
        last_completed: habit.last_completed,
        completion_rate: recent_events.len() as f64 / window_days as f64 * 100.,
        is_due_today: is_due(habit, today),
    }
}

/// Builds the summary for every habit of a user.
pub async fn streak_report<S: HabitStore, L: EventLog>(
    habits: &S,
    events: &L,
    user: &UserId,
    today: NaiveDate,
    window_days: u32,
) -> Result<Vec<StreakOverview>> {
    let habits = habits.habits_for(user, false).await?;
    let since = today - Duration::days(window_days as i64);

    let mut report = Vec::with_capacity(habits.len());
    for habit in &habits {
        let recent = events.events_for_habit(&habit.id, Some(since)).await?;
        report.push(streak_overview(habit, &recent, today, window_days));
    }
    Ok(report)
}
