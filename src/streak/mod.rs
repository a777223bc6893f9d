//! Streak derivation from completion history. [recompute] is the single
//! source of truth; the cached fields on a habit are always the last point of
//! its output. [advance] is the incremental shortcut applied on the hot
//! logging path when the new event is not out of order.

pub mod due;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::{domain::CompletionEvent, utils::time::day_diff};

/// One point of a habit's streak trajectory. Points exist only for days with
/// at least one completion; the streak value is undefined in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakPoint {
    pub date: NaiveDate,
    pub streak: u32,
}

/// Applies the day-difference rule to a single new completion: first
/// completion starts at 1, a same-day re-log leaves the streak unchanged, a
/// consecutive day increments, a gap resets to 1.
///
/// A completion dated before `last_completed` is refused. Mixing the
/// incremental rule with out-of-order input would corrupt the cache, so such
/// inserts must go through [recompute].
pub fn advance(
    last_completed: Option<NaiveDate>,
    streak: u32,
    completed: NaiveDate,
) -> Result<u32> {
    let Some(last) = last_completed else {
        return Ok(1);
    };

    match day_diff(last, completed) {
        diff if diff < 0 => {
            bail!("Completion on {completed} predates last completed day {last}")
        }
        0 => Ok(streak),
        1 => Ok(streak + 1),
        _ => Ok(1),
    }
}

/// Rebuilds the full streak trajectory from an event history. Events may
/// arrive in any order; same-day events collapse into one point, and the walk
/// over distinct days applies the same rule as [advance]. Deterministic:
/// only chronological day order matters, never insertion order.
pub fn recompute<'a>(events: impl IntoIterator<Item = &'a CompletionEvent>) -> Vec<StreakPoint> {
    let mut days = events
        .into_iter()
        .map(CompletionEvent::day)
        .collect::<Vec<_>>();
    days.sort_unstable();
    days.dedup();

    let mut points = Vec::with_capacity(days.len());
    let mut streak = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        streak = match previous {
            Some(p) if day_diff(p, day) == 1 => streak + 1,
            Some(_) | None => 1,
        };
        points.push(StreakPoint { date: day, streak });
        previous = Some(day);
    }
    points
}

/// Cached habit fields derivable from a trajectory: streak count and
/// last-completed day.
pub fn cache_fields(points: &[StreakPoint]) -> (u32, Option<NaiveDate>) {
    match points.last() {
        Some(point) => (point.streak, Some(point.date)),
        None => (0, None),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::domain::CompletionEvent;

    use super::{advance, cache_fields, recompute, StreakPoint};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    fn day(offset: u64) -> NaiveDate {
        TEST_DATE + chrono::Duration::days(offset as i64)
    }

    fn event(id: &str, completed: NaiveDate, seconds: u32) -> CompletionEvent {
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap();
        CompletionEvent {
            id: id.into(),
            habit_id: "habit".into(),
            user_id: "user".into(),
            completed_at: Utc.from_utc_datetime(&NaiveDateTime::new(completed, time)),
            note: None,
        }
    }

    #[test]
    fn advance_starts_at_one_without_history() -> Result<()> {
        assert_eq!(advance(None, 0, TEST_DATE)?, 1);
        Ok(())
    }

    #[test]
    fn advance_is_idempotent_within_a_day() -> Result<()> {
        assert_eq!(advance(Some(day(2)), 3, day(2))?, 3);
        Ok(())
    }

    #[test]
    fn advance_increments_on_consecutive_day() -> Result<()> {
        assert_eq!(advance(Some(day(2)), 3, day(3))?, 4);
        Ok(())
    }

    #[test]
    fn advance_resets_after_gap() -> Result<()> {
        assert_eq!(advance(Some(day(2)), 3, day(4))?, 1);
        assert_eq!(advance(Some(day(2)), 3, day(30))?, 1);
        Ok(())
    }

    #[test]
    fn advance_refuses_backdated_completion() {
        assert!(advance(Some(day(2)), 3, day(1)).is_err());
    }

    #[test]
    fn recompute_of_empty_history_is_empty() {
        let no_events: Vec<CompletionEvent> = vec![];
        assert!(recompute(&no_events).is_empty());
        assert_eq!(cache_fields(&[]), (0, None));
    }

    #[test]
    fn recompute_walks_gaps_and_runs() {
        // Days 0, 1, 2, 4: a three-day run, a skipped day, a fresh start.
        let events = vec![
            event("a", day(0), 60),
            event("b", day(1), 60),
            event("c", day(2), 60),
            event("d", day(4), 60),
        ];
        let points = recompute(&events);
        assert_eq!(
            points,
            vec![
                StreakPoint { date: day(0), streak: 1 },
                StreakPoint { date: day(1), streak: 2 },
                StreakPoint { date: day(2), streak: 3 },
                StreakPoint { date: day(4), streak: 1 },
            ]
        );
        assert_eq!(cache_fields(&points), (1, Some(day(4))));
    }

    #[test]
    fn recompute_collapses_same_day_events() {
        let events = vec![
            event("a", day(0), 60),
            event("b", day(0), 7200),
            event("c", day(1), 60),
        ];
        let points = recompute(&events);
        assert_eq!(
            points,
            vec![
                StreakPoint { date: day(0), streak: 1 },
                StreakPoint { date: day(1), streak: 2 },
            ]
        );
    }

    #[test]
    fn recompute_ignores_insertion_order() {
        let ordered = vec![
            event("a", day(0), 60),
            event("b", day(1), 60),
            event("c", day(2), 60),
            event("d", day(5), 60),
        ];
        let mut reversed = ordered.clone();
        reversed.reverse();
        let mut interleaved = vec![
            ordered[2].clone(),
            ordered[0].clone(),
            ordered[3].clone(),
            ordered[1].clone(),
        ];

        let expected = recompute(&ordered);
        assert_eq!(recompute(&reversed), expected);
        assert_eq!(recompute(&interleaved), expected);

        // Duplicated same-day entries in odd positions change nothing either.
        interleaved.push(event("e", day(1), 30));
        assert_eq!(recompute(&interleaved), expected);
    }

    #[test]
    fn recompute_matches_advance_on_in_order_input() -> Result<()> {
        let events = vec![
            event("a", day(0), 60),
            event("b", day(1), 60),
            event("c", day(3), 60),
            event("d", day(4), 60),
        ];
        let points = recompute(&events);

        let mut streak = 0;
        let mut last = None;
        for e in &events {
            streak = advance(last, streak, e.day())?;
            last = Some(e.day());
        }
        assert_eq!(cache_fields(&points), (streak, last));
        Ok(())
    }
}
