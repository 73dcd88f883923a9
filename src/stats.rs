// Task statistics and the recent-activity feed

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dates::DayWindow;
use crate::models::{Category, Status, Task};

/// Aggregate counts over the task collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total: usize,
    pub completed: usize,
    /// Only `status == pending`; in-progress tasks are counted separately
    pub pending: usize,
    pub in_progress: usize,
    /// Not completed and due before the start of today
    pub overdue: usize,
    /// Percentage in `0.0..=100.0`; zero for an empty collection
    pub completion_rate: f64,
    /// Every known category id, including those with no tasks
    pub by_category_id: BTreeMap<String, usize>,
}

impl TaskStatistics {
    /// Single pass over `tasks`
    pub fn compute(tasks: &[Task], categories: &[Category], window: &DayWindow) -> Self {
        let mut by_category_id: BTreeMap<String, usize> =
            categories.iter().map(|c| (c.id.clone(), 0)).collect();

        let mut completed = 0;
        let mut pending = 0;
        let mut in_progress = 0;
        let mut overdue = 0;

        for task in tasks {
            match task.status {
                Status::Completed => completed += 1,
                Status::Pending => pending += 1,
                Status::InProgress => in_progress += 1,
            }

            if !task.is_completed() && task.due_date.is_some_and(|due| window.is_past(due)) {
                overdue += 1;
            }

            if let Some(count) = task.category_id.as_ref().and_then(|id| by_category_id.get_mut(id)) {
                *count += 1;
            }
        }

        let total = tasks.len();
        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            completed,
            pending,
            in_progress,
            overdue,
            completion_rate,
            by_category_id,
        }
    }
}

/// What last happened to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Created,
    Updated,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
    pub task: Task,
}

impl Activity {
    pub fn of(task: &Task) -> Self {
        let kind = if task.is_completed() {
            ActivityKind::Completed
        } else if task.updated_at.is_some() {
            ActivityKind::Updated
        } else {
            ActivityKind::Created
        };

        Self {
            kind,
            at: task.last_activity(),
            task: task.clone(),
        }
    }
}

/// Most recently touched tasks first, at most `limit` of them
pub fn recent_activity(tasks: &[Task], limit: usize) -> Vec<Activity> {
    let mut feed: Vec<Activity> = tasks.iter().map(Activity::of).collect();
    feed.sort_by(|a, b| b.at.cmp(&a.at));
    feed.truncate(limit);
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, default_categories};
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
    }

    fn task(id: &str, status: Status, due_day: u32, category: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            due_date: Some(at(due_day, 9)),
            priority: Priority::Medium,
            status,
            category_id: category.map(str::to_string),
            created_at: at(1, 8),
            updated_at: None,
            sub_tasks: Vec::new(),
            notes: None,
        }
    }

    fn window() -> DayWindow {
        DayWindow::at(&at(10, 15))
    }

    #[test]
    fn test_empty_collection() {
        let stats = TaskStatistics::compute(&[], &default_categories(), &window());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.by_category_id.len(), 6);
        assert!(stats.by_category_id.values().all(|&n| n == 0));
    }

    #[test]
    fn test_counts_and_rate() {
        let tasks = vec![
            task("a", Status::Pending, 9, Some("work")),
            task("b", Status::Completed, 9, Some("work")),
            task("c", Status::InProgress, 12, Some("health")),
            task("d", Status::Completed, 14, None),
        ];
        let stats = TaskStatistics::compute(&tasks, &default_categories(), &window());

        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed + stats.pending + stats.in_progress, stats.total);
        assert_eq!(stats.completion_rate, 50.0);
        assert_eq!(stats.by_category_id["work"], 2);
        assert_eq!(stats.by_category_id["health"], 1);
        assert_eq!(stats.by_category_id["travel"], 0);
        assert_eq!(stats.by_category_id.values().sum::<usize>(), 3);
    }

    #[test]
    fn test_overdue_excludes_completed() {
        let tasks = vec![
            task("late", Status::Pending, 9, None),
            task("done-late", Status::Completed, 9, None),
            task("today", Status::Pending, 10, None),
        ];
        let stats = TaskStatistics::compute(&tasks, &[], &window());
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn test_unknown_category_not_counted() {
        let tasks = vec![task("a", Status::Pending, 12, Some("gone"))];
        let stats = TaskStatistics::compute(&tasks, &default_categories(), &window());
        assert!(!stats.by_category_id.contains_key("gone"));
        assert_eq!(stats.by_category_id.values().sum::<usize>(), 0);
    }

    #[test]
    fn test_recent_activity_order_and_kind() {
        let created = task("created", Status::Pending, 12, None);

        let mut updated = task("updated", Status::InProgress, 12, None);
        updated.updated_at = Some(at(6, 0));

        let mut completed = task("completed", Status::Completed, 12, None);
        completed.updated_at = Some(at(4, 0));

        let feed = recent_activity(&[created, updated, completed], 2);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].task.id, "updated");
        assert_eq!(feed[0].kind, ActivityKind::Updated);
        assert_eq!(feed[1].task.id, "completed");
        assert_eq!(feed[1].kind, ActivityKind::Completed);
        assert_eq!(feed[1].at, at(4, 0));
    }
}
