// Task filtering and sorting

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::dates::DayWindow;
use crate::models::{Priority, Status, Task};

/// Filter criteria for listing tasks
///
/// Every field is optional; set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Exact status match
    pub status: Option<Status>,
    /// Exact priority match
    pub priority: Option<Priority>,
    /// Exact category match
    pub category_id: Option<String>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Relative due-date window
    pub due: Option<DueBucket>,
}

/// Relative due-date windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DueBucket {
    /// Due between the start of today and the start of tomorrow
    Today,
    /// Due within the next seven days, counting from the start of today
    Upcoming,
    /// Not completed and due before the start of today
    Overdue,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check one task against every enabled predicate
    pub fn matches(&self, task: &Task, window: &DayWindow) -> bool {
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }

        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }

        let category_id = self.category_id.as_deref().filter(|c| !c.is_empty());
        if category_id.is_some_and(|c| task.category_id.as_deref() != Some(c)) {
            return false;
        }

        let search = self.search.as_deref().filter(|s| !s.is_empty());
        if search.is_some_and(|s| !matches_search(task, &s.to_lowercase())) {
            return false;
        }

        self.due.is_none_or(|bucket| bucket.matches(task, window))
    }
}

impl DueBucket {
    /// Tasks without a due date never fall into a bucket
    pub fn matches(self, task: &Task, window: &DayWindow) -> bool {
        let Some(due) = task.due_date else {
            return false;
        };
        match self {
            DueBucket::Today => window.is_today(due),
            DueBucket::Upcoming => window.is_upcoming(due),
            DueBucket::Overdue => !task.is_completed() && window.is_past(due),
        }
    }
}

fn matches_search(task: &Task, needle_lower: &str) -> bool {
    task.title.to_lowercase().contains(needle_lower)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle_lower))
}

/// Sort orders for task lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Earliest due date first; undated tasks last
    #[default]
    #[serde(alias = "dueDate", alias = "due_date", alias = "due")]
    DueDate,
    /// High, then medium, then low
    Priority,
    /// Alphabetical, case-folded
    Title,
    /// Most recently created first
    #[serde(alias = "createdAt", alias = "created_at", alias = "created")]
    CreatedAt,
    /// Keep the input order
    None,
}

impl SortKey {
    /// Lenient lookup; unrecognized names fall back to `SortKey::None`
    ///
    /// Accepts the same names as deserialization.
    pub fn parse(name: &str) -> Self {
        match name {
            "dueDate" | "due-date" | "due_date" | "due" => SortKey::DueDate,
            "priority" => SortKey::Priority,
            "title" => SortKey::Title,
            "createdAt" | "created-at" | "created_at" | "created" => SortKey::CreatedAt,
            _ => SortKey::None,
        }
    }
}

/// Return a sorted copy of `tasks`; the input is left untouched
///
/// The sort is stable: tasks with equal keys keep their input order.
pub fn sort_tasks(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();

    match key {
        SortKey::DueDate => sorted.sort_by(|a, b| compare_due(a, b)),
        SortKey::Priority => sorted.sort_by_key(|t| t.priority.rank()),
        SortKey::Title => sorted.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::CreatedAt => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::None => {}
    }

    sorted
}

fn compare_due(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-folded comparison; lowercase sorts before uppercase on a tie
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}
