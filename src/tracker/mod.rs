//! Completion lifecycle. Applies log and log-removal actions against the
//! event log while keeping each habit's cached streak fields equal to what
//! [streak::recompute](crate::streak::recompute) would yield from the full
//! history.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    domain::{CompletionEvent, EventId, HabitId},
    store::{EventLog, HabitStore},
    streak,
};

/// Refreshed cache after a lifecycle action, echoed back so the hosting API
/// can report the new streak alongside the log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub habit_id: HabitId,
    pub streak_count: u32,
    #[serde(rename = "lastCompletedDate")]
    pub last_completed: Option<NaiveDate>,
}

/// Bridges the event log and the habit store. The cached fields are the only
/// shared mutable state in the engine, so every read-modify-write of them
/// goes through a per-habit lock.
pub struct HabitTracker<S, L> {
    habits: S,
    events: L,
    locks: Mutex<HashMap<HabitId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: HabitStore, L: EventLog> HabitTracker<S, L> {
    pub fn new(habits: S, events: L) -> Self {
        Self {
            habits,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn habit_guard(&self, id: &HabitId) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Records a completion and advances the cached streak. A backdated
    /// event (dated before the cached last-completed day) cannot go through
    /// the incremental rule and triggers a full-history recompute instead.
    pub async fn log_completion(&self, event: CompletionEvent) -> Result<StreakUpdate> {
        let _guard = self.habit_guard(&event.habit_id).await;

        let habit = self
            .habits
            .habit(&event.habit_id)
            .await?
            .with_context(|| format!("Can't log completion for unknown habit {}", event.habit_id))?;

        let day = event.day();
        let habit_id = habit.id.clone();

        if habit.last_completed.is_some_and(|last| day < last) {
            debug!("Backdated completion for {habit_id} on {day}, recomputing from history");
            self.events.append(event).await?;
            return self.refresh_cache(&habit_id).await;
        }

        let streak_count = streak::advance(habit.last_completed, habit.streak_count, day)?;
        self.events.append(event).await?;
        self.habits
            .persist_cache(&habit_id, streak_count, Some(day))
            .await?;
        info!("Habit {habit_id} completed on {day}, streak {streak_count}");

        Ok(StreakUpdate {
            habit_id,
            streak_count,
            last_completed: Some(day),
        })
    }

    /// Deletes a completion. The incremental rule cannot undo an event, so
    /// the cache is always rebuilt from the remaining history. Returns `None`
    /// when no such event exists.
    pub async fn remove_completion(&self, event: &EventId) -> Result<Option<StreakUpdate>> {
        let Some(removed) = self.events.remove(event).await? else {
            return Ok(None);
        };

        let _guard = self.habit_guard(&removed.habit_id).await;
        let update = self.refresh_cache(&removed.habit_id).await?;
        info!("Removed completion {event} of habit {}", removed.habit_id);
        Ok(Some(update))
    }

    async fn refresh_cache(&self, habit: &HabitId) -> Result<StreakUpdate> {
        let history = self.events.events_for_habit(habit, None).await?;
        let (streak_count, last_completed) = streak::cache_fields(&streak::recompute(&history));
        self.habits
            .persist_cache(habit, streak_count, last_completed)
            .await?;
        Ok(StreakUpdate {
            habit_id: habit.clone(),
            streak_count,
            last_completed,
        })
    }
}
