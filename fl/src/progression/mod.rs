//! Task progression: daily and upcoming views, completion, recurrence, stats
//!
//! The engine owns no state of its own. Every operation reads a fresh list
//! from the StateManager and derives what it needs.

mod engine;
mod streak;
mod summary;

pub use engine::{CompletionOutcome, MAX_UPCOMING_DAYS, ProgressionEngine};
pub use streak::{MAX_STREAK_SCAN_DAYS, current_streak};
pub use summary::{DayBucket, TaskStats, completion_rate};
