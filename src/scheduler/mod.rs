//! Tick-driven reminder matching. [trigger::PeriodicTrigger] emits a
//! [trigger::Tick] once per interval; [NotificationScheduler] receives them
//! over a bounded channel and scans. Awaiting the channel is the idle state,
//! handling one tick is the scanning state, so scans are strictly serialized
//! and a slow one delays the next tick instead of overlapping it.

pub mod channels;
pub mod trigger;

use std::{collections::HashSet, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future;
use now::DateTimeNow;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{DueNotification, Habit, HabitId, ReminderTime},
    store::{HabitStore, UserDirectory},
    streak::due::is_due,
    utils::clock::Clock,
};

use channels::NotificationChannel;
use trigger::{PeriodicTrigger, Tick};

pub struct NotificationScheduler<S, U> {
    ticks: mpsc::Receiver<Tick>,
    habits: S,
    users: U,
    channels: Vec<Box<dyn NotificationChannel>>,
    /// Habits already notified within the current wall-clock minute, so a
    /// duplicate tick in the same minute cannot double-send.
    fired: HashSet<HabitId>,
    window: Option<DateTime<Utc>>,
}

impl<S: HabitStore, U: UserDirectory> NotificationScheduler<S, U> {
    pub fn new(
        ticks: mpsc::Receiver<Tick>,
        habits: S,
        users: U,
        channels: Vec<Box<dyn NotificationChannel>>,
    ) -> Self {
        Self {
            ticks,
            habits,
            users,
            channels,
            fired: HashSet::new(),
            window: None,
        }
    }

    /// Executes the scan loop until the tick sender is dropped. A failed scan
    /// is logged and the loop moves on to the next tick.
    pub async fn run(mut self) -> Result<()> {
        while let Some(tick) = self.ticks.recv().await {
            debug!("Scanning for due reminders at {}", tick.at);
            match self.scan(tick).await {
                Ok(notified) => {
                    if notified > 0 {
                        info!("Notified {notified} due habit(s)");
                    }
                }
                Err(e) => error!("Reminder scan failed: {e:?}"),
            }
        }
        Ok(())
    }

    async fn scan(&mut self, tick: Tick) -> Result<usize> {
        let minute = tick.at.beginning_of_minute();
        if self.window != Some(minute) {
            self.window = Some(minute);
            self.fired.clear();
        }

        let today = tick.at.date_naive();
        let mut matched = Vec::new();
        for habit in self.habits.active_habits().await? {
            let reminder = match habit.reminder_time.parse::<ReminderTime>() {
                Ok(v) => v,
                Err(e) => {
                    warn!("Habit {} has an unusable reminder time: {e}", habit.id);
                    continue;
                }
            };
            if !reminder.matches(tick.at.time()) || !is_due(&habit, today) {
                continue;
            }
            if !self.fired.insert(habit.id.clone()) {
                continue;
            }
            matched.push(habit);
        }

        // Habits are independent within a tick, so dispatch them concurrently.
        let notified = matched.len();
        future::join_all(matched.into_iter().map(|habit| self.notify(habit))).await;
        Ok(notified)
    }

    /// Delivers one habit's reminder to every channel its owner has enabled.
    /// A failing channel is logged and skipped; the rest still go out.
    async fn notify(&self, habit: Habit) {
        let user = match self.users.user(&habit.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Habit {} belongs to unknown user {}", habit.id, habit.user_id);
                return;
            }
            Err(e) => {
                error!("Can't load user {} for habit {}: {e:?}", habit.user_id, habit.id);
                return;
            }
        };

        let notification = DueNotification {
            habit_id: habit.id.clone(),
            user_id: habit.user_id.clone(),
            streak_count: habit.streak_count,
            habit_name: habit.name.clone(),
        };

        for channel in &self.channels {
            if !user.prefs.enabled(channel.kind()) {
                continue;
            }
            if let Err(e) = channel.deliver(&user, &notification).await {
                error!(
                    "Delivering reminder for habit {} via {:?} failed: {e:?}",
                    habit.id,
                    channel.kind()
                );
            }
        }
    }
}

/// Wires the trigger and the scheduler together and drives both to
/// completion. The capacity-one tick channel is the serialization point
/// between them.
pub async fn run_reminder_loop<S, U>(
    habits: S,
    users: U,
    channels: Vec<Box<dyn NotificationChannel>>,
    interval: Duration,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: HabitStore + Send + Sync,
    U: UserDirectory + Send + Sync,
{
    let (sender, receiver) = mpsc::channel::<Tick>(1);
    let trigger = PeriodicTrigger::new(sender, shutdown, interval, clock);
    let scheduler = NotificationScheduler::new(receiver, habits, users, channels);

    let (trigger_result, scheduler_result) = tokio::join!(trigger.run(), scheduler.run());
    trigger_result?;
    scheduler_result
}
