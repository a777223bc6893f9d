//! Collaborator contracts the engine consumes. Storage technology lives
//! behind these traits; [memory::MemoryStore] is the shipped implementation
//! for tests and hosts that keep personal-scale data resident.

pub mod memory;

use std::{future::Future, ops::Deref};

use anyhow::Result;
use chrono::NaiveDate;

use crate::domain::{CompletionEvent, EventId, Habit, HabitId, User, UserId};

/// Ordered append/delete store of completion events. Queries return events
/// sorted by completion instant ascending.
pub trait EventLog {
    /// Full history for one habit, optionally restricted to days on or after
    /// `since`.
    fn events_for_habit(
        &self,
        habit: &HabitId,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<CompletionEvent>>> + Send;

    /// Every event belonging to one user, optionally restricted to days on
    /// or after `since`.
    fn events_for_user(
        &self,
        user: &UserId,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<CompletionEvent>>> + Send;

    fn append(&self, event: CompletionEvent) -> impl Future<Output = Result<()>> + Send;

    /// Removes an event, returning it when it existed.
    fn remove(
        &self,
        event: &EventId,
    ) -> impl Future<Output = Result<Option<CompletionEvent>>> + Send;
}

impl<T: Deref + Sync> EventLog for T
where
    T::Target: EventLog + Sync,
{
    fn events_for_habit(
        &self,
        habit: &HabitId,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<CompletionEvent>>> + Send {
        self.deref().events_for_habit(habit, since)
    }

    fn events_for_user(
        &self,
        user: &UserId,
        since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<CompletionEvent>>> + Send {
        self.deref().events_for_user(user, since)
    }

    fn append(&self, event: CompletionEvent) -> impl Future<Output = Result<()>> + Send {
        self.deref().append(event)
    }

    fn remove(
        &self,
        event: &EventId,
    ) -> impl Future<Output = Result<Option<CompletionEvent>>> + Send {
        self.deref().remove(event)
    }
}

/// Habit records plus the cache write-back the streak lifecycle needs.
pub trait HabitStore {
    fn habit(&self, id: &HabitId) -> impl Future<Output = Result<Option<Habit>>> + Send;

    fn habits_for(
        &self,
        user: &UserId,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<Habit>>> + Send;

    /// Active habits across all users; the scheduler scans these each tick.
    fn active_habits(&self) -> impl Future<Output = Result<Vec<Habit>>> + Send;

    /// Writes the cached derived fields back onto a habit.
    fn persist_cache(
        &self,
        id: &HabitId,
        streak_count: u32,
        last_completed: Option<NaiveDate>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref + Sync> HabitStore for T
where
    T::Target: HabitStore + Sync,
{
    fn habit(&self, id: &HabitId) -> impl Future<Output = Result<Option<Habit>>> + Send {
        self.deref().habit(id)
    }

    fn habits_for(
        &self,
        user: &UserId,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<Habit>>> + Send {
        self.deref().habits_for(user, active_only)
    }

    fn active_habits(&self) -> impl Future<Output = Result<Vec<Habit>>> + Send {
        self.deref().active_habits()
    }

    fn persist_cache(
        &self,
        id: &HabitId,
        streak_count: u32,
        last_completed: Option<NaiveDate>,
    ) -> impl Future<Output = Result<()>> + Send {
        self.deref().persist_cache(id, streak_count, last_completed)
    }
}

/// Lookup of notification recipients and their channel preferences.
pub trait UserDirectory {
    fn user(&self, id: &UserId) -> impl Future<Output = Result<Option<User>>> + Send;
}

impl<T: Deref + Sync> UserDirectory for T
where
    T::Target: UserDirectory + Sync,
{
    fn user(&self, id: &UserId) -> impl Future<Output = Result<Option<User>>> + Send {
        self.deref().user(id)
    }
}
