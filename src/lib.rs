//! Streak and analytics engine for habit tracking. Derives consecutive-day
//! streaks from a log of completion events, aggregates zero-filled daily
//! series for charting, and matches due habits against their reminder times
//! on a periodic tick.
//!

pub mod analytics;
pub mod domain;
pub mod scheduler;
pub mod store;
pub mod streak;
pub mod tracker;
pub mod utils;
