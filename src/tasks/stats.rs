use serde::Serialize;
use time::OffsetDateTime;

use super::{
    repo::StatsCounts,
    repo_types::{Priority, Task},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    /// Open tasks at `High Priority`.
    pub high_priority: i64,
    pub overdue: i64,
    /// Rounded percentage, 0 when there are no tasks.
    pub completion_rate: i64,
}

impl TaskStats {
    pub fn from_counts(c: StatsCounts) -> Self {
        let completion_rate = if c.total > 0 {
            (c.completed as f64 * 100.0 / c.total as f64).round() as i64
        } else {
            0
        };
        Self {
            total: c.total,
            completed: c.completed,
            pending: c.total - c.completed,
            high_priority: c.high_priority,
            overdue: c.overdue,
            completion_rate,
        }
    }
}

/// Single pass over a snapshot; agrees with the SQL aggregate.
pub fn summarize(tasks: &[Task], now: OffsetDateTime) -> TaskStats {
    let mut counts = StatsCounts::default();
    for task in tasks {
        counts.total += 1;
        if task.completed {
            counts.completed += 1;
            continue;
        }
        if task.priority == Priority::High {
            counts.high_priority += 1;
        }
        if task.due_date.is_some_and(|due| due < now) {
            counts.overdue += 1;
        }
    }
    TaskStats::from_counts(counts)
}
