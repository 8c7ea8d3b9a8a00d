//! Derived task statistics and per-day buckets

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{EnrichedTask, TaskStatus};

/// Aggregate statistics for one user. Derived on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub overdue_tasks: usize,
    /// Percentage of tasks completed, 0-100
    pub completion_rate: u8,
    /// Consecutive local days with a completion
    pub streak: u32,
    pub total_points: u64,
}

/// `round(100 * completed / total)`, 0 when there are no tasks
pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rate = (completed as f64 * 100.0 / total as f64).round();
    rate.clamp(0.0, 100.0) as u8
}

/// One calendar day of tasks in an upcoming summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub tasks: Vec<EnrichedTask>,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl DayBucket {
    /// Build a bucket and its counts; overdue means pending and due before `now`
    pub fn new(date: NaiveDate, tasks: Vec<EnrichedTask>, now: DateTime<Utc>) -> Self {
        let completed = tasks.iter().filter(|t| t.task.status == TaskStatus::Completed).count();
        let pending = tasks.iter().filter(|t| t.task.is_pending()).count();
        let overdue = tasks.iter().filter(|t| t.task.is_overdue(now)).count();
        Self {
            date,
            tasks,
            completed,
            pending,
            overdue,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::{TaskCategory, TaskInstance, TaskTemplate};

    #[test]
    fn test_completion_rate_rounding() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 2), 50);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(3, 3), 100);
        assert_eq!(completion_rate(0, 0), 0);
    }

    #[test]
    fn test_day_bucket_counts() {
        let now = Utc.with_ymd_and_hms(2024, 8, 1, 12, 0, 0).unwrap();
        let template = TaskTemplate::new("Walk", TaskCategory::Other, 5);
        let morning = Utc.with_ymd_and_hms(2024, 8, 1, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 8, 1, 20, 0, 0).unwrap();

        let overdue = TaskInstance::new("alice", "walk", morning);
        let later = TaskInstance::new("alice", "walk", evening);
        let mut done = TaskInstance::new("alice", "walk", morning);
        done.mark_completed(morning);
        let mut skipped = TaskInstance::new("alice", "walk", morning);
        skipped.mark_skipped("rain");

        let tasks = [overdue, later, done, skipped]
            .into_iter()
            .map(|t| EnrichedTask::new(t, template.clone()))
            .collect();
        let bucket = DayBucket::new(now.date_naive(), tasks, now);

        assert_eq!(bucket.completed, 1);
        assert_eq!(bucket.pending, 2);
        assert_eq!(bucket.overdue, 1);
        assert!(!bucket.is_empty());
    }
}
