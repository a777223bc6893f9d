use chrono::NaiveDate;

use crate::domain::Habit;

/// A habit is due while no completion has been recorded on the current
/// calendar day. Pure; callers supply `today` from their clock.
pub fn is_due(habit: &Habit, today: NaiveDate) -> bool {
    match habit.last_completed {
        Some(last) => last != today,
        None => true,
    }
}
