use std::{
    collections::HashMap,
    sync::RwLock,
};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::domain::{CompletionEvent, EventId, Habit, HabitId, User, UserId};

use super::{EventLog, HabitStore, UserDirectory};

/// The in-memory realization of the storage contracts. Lock sections are
/// short and never held across an await.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    habits: HashMap<HabitId, Habit>,
    users: HashMap<UserId, User>,
    events: Vec<CompletionEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_habit(&self, habit: Habit) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .habits
            .insert(habit.id.clone(), habit);
    }

    pub fn insert_user(&self, user: User) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .users
            .insert(user.id.clone(), user);
    }

    fn collect_events(
        &self,
        mut keep: impl FnMut(&CompletionEvent) -> bool,
        since: Option<NaiveDate>,
    ) -> Vec<CompletionEvent> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut events = inner
            .events
            .iter()
            .filter(|e| keep(e) && since.map_or(true, |day| e.day() >= day))
            .cloned()
            .collect::<Vec<_>>();
        events.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        events
    }
}

impl EventLog for MemoryStore {
    async fn events_for_habit(
        &self,
        habit: &HabitId,
        since: Option<NaiveDate>,
    ) -> Result<Vec<CompletionEvent>> {
        Ok(self.collect_events(|e| e.habit_id == *habit, since))
    }

    async fn events_for_user(
        &self,
        user: &UserId,
        since: Option<NaiveDate>,
    ) -> Result<Vec<CompletionEvent>> {
        Ok(self.collect_events(|e| e.user_id == *user, since))
    }

    async fn append(&self, event: CompletionEvent) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.events.iter().any(|e| e.id == event.id) {
            return Err(anyhow!("Event {} already logged", event.id));
        }
        inner.events.push(event);
        Ok(())
    }

    async fn remove(&self, event: &EventId) -> Result<Option<CompletionEvent>> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let position = inner.events.iter().position(|e| e.id == *event);
        Ok(position.map(|i| inner.events.remove(i)))
    }
}

impl HabitStore for MemoryStore {
    async fn habit(&self, id: &HabitId) -> Result<Option<Habit>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.habits.get(id).cloned())
    }

    async fn habits_for(&self, user: &UserId, active_only: bool) -> Result<Vec<Habit>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut habits = inner
            .habits
            .values()
            .filter(|h| h.user_id == *user && (!active_only || h.active))
            .cloned()
            .collect::<Vec<_>>();
        habits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(habits)
    }

    async fn active_habits(&self) -> Result<Vec<Habit>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut habits = inner
            .habits
            .values()
            .filter(|h| h.active)
            .cloned()
            .collect::<Vec<_>>();
        habits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(habits)
    }

    async fn persist_cache(
        &self,
        id: &HabitId,
        streak_count: u32,
        last_completed: Option<NaiveDate>,
    ) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let habit = inner
            .habits
            .get_mut(id)
            .ok_or_else(|| anyhow!("Can't cache streak for unknown habit {id}"))?;
        habit.streak_count = streak_count;
        habit.last_completed = last_completed;
        Ok(())
    }
}

impl UserDirectory for MemoryStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.users.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::{
        domain::{CompletionEvent, Habit},
        store::{EventLog, HabitStore},
    };

    use super::MemoryStore;

    fn habit(id: &str, active: bool) -> Habit {
        Habit {
            id: id.into(),
            user_id: "user".into(),
            name: id.into(),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            reminder_time: "09:00".into(),
            frequency: Default::default(),
            active,
            streak_count: 0,
            last_completed: None,
        }
    }

    fn event(id: &str, habit: &str, day: u32, hour: u32) -> CompletionEvent {
        CompletionEvent {
            id: id.into(),
            habit_id: habit.into(),
            user_id: "user".into(),
            completed_at: Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap(),
            note: None,
        }
    }

    #[tokio::test]
    async fn events_come_back_ordered_by_instant() -> Result<()> {
        let store = MemoryStore::new();
        store.append(event("c", "h1", 7, 8)).await?;
        store.append(event("a", "h1", 5, 20)).await?;
        store.append(event("b", "h1", 6, 12)).await?;

        let events = store.events_for_habit(&"h1".into(), None).await?;
        let ids = events.iter().map(|e| e.id.to_string()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
        Ok(())
    }

    #[tokio::test]
    async fn since_filter_cuts_older_days() -> Result<()> {
        let store = MemoryStore::new();
        store.append(event("a", "h1", 5, 20)).await?;
        store.append(event("b", "h1", 6, 12)).await?;

        let since = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap();
        let events = store.events_for_habit(&"h1".into(), Some(since)).await?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "b".into());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_event_id_is_refused() -> Result<()> {
        let store = MemoryStore::new();
        store.append(event("a", "h1", 5, 20)).await?;
        assert!(store.append(event("a", "h1", 6, 20)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn remove_returns_the_event_once() -> Result<()> {
        let store = MemoryStore::new();
        store.append(event("a", "h1", 5, 20)).await?;

        let removed = store.remove(&"a".into()).await?;
        assert_eq!(removed.map(|e| e.id), Some("a".into()));
        assert!(store.remove(&"a".into()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn active_habits_excludes_paused_ones() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_habit(habit("h1", true));
        store.insert_habit(habit("h2", false));

        let active = store.active_habits().await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "h1".into());

        let all = store.habits_for(&"user".into(), false).await?;
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn persist_cache_updates_the_habit() -> Result<()> {
        let store = MemoryStore::new();
        store.insert_habit(habit("h1", true));

        let last = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        store.persist_cache(&"h1".into(), 4, Some(last)).await?;

        let stored = store.habit(&"h1".into()).await?.unwrap();
        assert_eq!(stored.streak_count, 4);
        assert_eq!(stored.last_completed, Some(last));

        assert!(store.persist_cache(&"nope".into(), 1, None).await.is_err());
        Ok(())
    }
}
