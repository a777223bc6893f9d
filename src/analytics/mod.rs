//! Aggregation of completion events into the daily series consumed by the
//! charting layer. Everything here is pure over slices; the async wrappers at
//! the bottom only fetch and delegate, so a cached implementation can be
//! substituted behind the same response shape.

pub mod overview;

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::{
    domain::{CompletionEvent, Habit, HabitId, UserId},
    store::{EventLog, HabitStore},
    streak::{self, StreakPoint},
    utils::time::day_range,
};

/// One day of a zero-filled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSeries {
    pub habit_id: HabitId,
    pub name: Arc<str>,
    pub data: Vec<DailyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSeries {
    pub habit_id: HabitId,
    pub name: Arc<str>,
    pub data: Vec<StreakPoint>,
}

/// The wire contract of the presentation layer. Field names must stay
/// exactly as they are; chart components key on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub overall_progress: Vec<DailyBucket>,
    pub habit_completions: Vec<HabitSeries>,
    pub streak_history: Vec<StreakSeries>,
}

/// Builds the three chart series over `[range start, today]`. The range
/// starts at the earliest event day, falling back to the earliest habit
/// creation day; with no habits at all every output is empty.
///
/// Overall and per-habit series are zero-filled for every day in range.
/// Streak history carries points only on days that have a completion; the
/// value is undefined in between and is not interpolated.
pub fn build_daily_series(
    habits: &[Habit],
    events: &[CompletionEvent],
    today: NaiveDate,
) -> AnalyticsResponse {
    if habits.is_empty() {
        return AnalyticsResponse::default();
    }
    let Some(from) = range_start(habits, events) else {
        return AnalyticsResponse::default();
    };

    let zero_filled: BTreeMap<NaiveDate, u32> = day_range(from, today).map(|d| (d, 0)).collect();
    let mut overall = zero_filled.clone();
    let mut per_habit: HashMap<&HabitId, BTreeMap<NaiveDate, u32>> = habits
        .iter()
        .map(|h| (&h.id, zero_filled.clone()))
        .collect();

    for event in events {
        let day = event.day();
        let Some(slot) = overall.get_mut(&day) else {
            // Typically an event stamped after `today`; charting a day that
            // does not exist yet would desync the series lengths.
            warn!("Skipping event {} on {day} outside {from}..={today}", event.id);
            continue;
        };
        *slot += 1;

        match per_habit.get_mut(&event.habit_id) {
            Some(series) => {
                if let Some(slot) = series.get_mut(&day) {
                    *slot += 1;
                }
            }
            None => warn!(
                "Event {} references habit {} missing from the aggregation",
                event.id, event.habit_id
            ),
        }
    }

    let habit_completions = habits
        .iter()
        .map(|habit| HabitSeries {
            habit_id: habit.id.clone(),
            name: habit.name.clone(),
            data: per_habit
                .remove(&habit.id)
                .map(into_buckets)
                .unwrap_or_default(),
        })
        .collect();

    let streak_history = habits
        .iter()
        .map(|habit| StreakSeries {
            habit_id: habit.id.clone(),
            name: habit.name.clone(),
            data: streak::recompute(
                events
                    .iter()
                    .filter(|e| e.habit_id == habit.id && e.day() <= today),
            ),
        })
        .collect();

    AnalyticsResponse {
        overall_progress: into_buckets(overall),
        habit_completions,
        streak_history,
    }
}

fn range_start(habits: &[Habit], events: &[CompletionEvent]) -> Option<NaiveDate> {
    events
        .iter()
        .map(CompletionEvent::day)
        .min()
        .or_else(|| habits.iter().map(|h| h.created_at.date_naive()).min())
}

fn into_buckets(series: BTreeMap<NaiveDate, u32>) -> Vec<DailyBucket> {
    series
        .into_iter()
        .map(|(date, count)| DailyBucket { date, count })
        .collect()
}

/// Fetches one user's habits and full event history and aggregates them.
pub async fn user_analytics<S: HabitStore, L: EventLog>(
    habits: &S,
    events: &L,
    user: &UserId,
    today: NaiveDate,
) -> Result<AnalyticsResponse> {
    let habits = habits.habits_for(user, false).await?;
    let events = events.events_for_user(user, None).await?;
    Ok(build_daily_series(&habits, &events, today))
}
