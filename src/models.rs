// Data models for taskkeep

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// A user-tracked unit of work
///
/// Serialized with camelCase field names so stored and exported documents
/// keep the `dueDate` / `categoryId` / `subTasks` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Task {
    /// Build a task from caller-supplied fields with a fresh id
    pub fn from_new(new: NewTask, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            priority: new.priority,
            status: new.status,
            category_id: new.category_id,
            created_at,
            updated_at: None,
            sub_tasks: new.sub_tasks,
            notes: new.notes,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Completed and total subtask counts
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.sub_tasks.iter().filter(|s| s.completed).count();
        (done, self.sub_tasks.len())
    }

    /// Timestamp of the most recent change (update, or creation if never updated)
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// A checklist item nested within a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl SubTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            completed: false,
        }
    }
}

/// A named, colored label for grouping tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl Category {
    pub fn from_new(new: NewCategory) -> Self {
        Self {
            id: new_id(),
            name: new.name,
            color: new.color,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort rank: high sorts first
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller-supplied fields for a new task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub status: Status,
    pub category_id: Option<String>,
    pub sub_tasks: Vec<SubTask>,
    pub notes: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Form-level checks: a non-blank title and a due date.
    ///
    /// The store itself never calls this.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::validation("title", "Title is required"));
        }
        if self.due_date.is_none() {
            return Err(StoreError::validation("dueDate", "Due date is required"));
        }
        Ok(())
    }
}

/// Partial task update. Only `Some` fields change; `id` and `createdAt`
/// are not reachable from here.
///
/// Nullable fields take a nested option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub category_id: Option<Option<String>>,
    pub sub_tasks: Option<Vec<SubTask>>,
    pub notes: Option<Option<String>>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(category_id) = self.category_id {
            task.category_id = category_id;
        }
        if let Some(sub_tasks) = self.sub_tasks {
            task.sub_tasks = sub_tasks;
        }
        if let Some(notes) = self.notes {
            task.notes = notes;
        }
    }
}

/// Caller-supplied fields for a new category
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

impl Default for NewCategory {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
        }
    }
}

impl NewCategory {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Form-level checks: a non-blank name and a hex color.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::validation("name", "Category name is required"));
        }
        if !is_hex_color(&self.color) {
            return Err(StoreError::validation("color", "Color must be a hex value like #3f51b5"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl CategoryPatch {
    pub(crate) fn apply(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(color) = self.color {
            category.color = color;
        }
    }
}

pub const DEFAULT_CATEGORY_COLOR: &str = "#3f51b5";

/// Categories seeded when nothing usable is stored
pub fn default_categories() -> Vec<Category> {
    [
        ("work", "Work", "#3f51b5"),
        ("personal", "Personal", "#f50057"),
        ("study", "Study", "#4caf50"),
        ("health", "Health & Fitness", "#ff9800"),
        ("shopping", "Shopping", "#9c27b0"),
        ("travel", "Travel", "#00bcd4"),
    ]
    .into_iter()
    .map(|(id, name, color)| Category {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

/// Generate a fresh opaque id
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// `#rgb` or `#rrggbb`
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        Task {
            id: "task-1".to_string(),
            title: "Write report".to_string(),
            description: Some("Q4 numbers".to_string()),
            due_date: Some(Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap()),
            priority: Priority::High,
            status: Status::InProgress,
            category_id: Some("work".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            updated_at: None,
            sub_tasks: vec![SubTask {
                id: "sub-1".to_string(),
                text: "Gather data".to_string(),
                completed: true,
            }],
            notes: None,
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_task_uses_camel_case_fields() {
        let json = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(json["dueDate"], "2025-03-12T09:00:00Z");
        assert_eq!(json["categoryId"], "work");
        assert_eq!(json["subTasks"][0]["text"], "Gather data");
        assert!(json.get("updatedAt").is_none());
        assert!(json.get("notes").is_none());
    }

    #[test]
    fn test_task_deserializes_with_defaults() {
        let task: Task = serde_json::from_str(
            r#"{"id":"t1","title":"Bare","createdAt":"2025-03-01T08:00:00.000Z","categoryId":null}"#,
        )
        .unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, Status::Pending);
        assert!(task.due_date.is_none());
        assert!(task.category_id.is_none());
        assert!(task.sub_tasks.is_empty());
    }

    #[test]
    fn test_priority_rank() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let mut task = sample_task();
        let before = task.clone();

        TaskPatch::status(Status::Completed).apply(&mut task);

        assert_eq!(task.status, Status::Completed);
        assert_eq!(task.title, before.title);
        assert_eq!(task.description, before.description);
        assert_eq!(task.category_id, before.category_id);
    }

    #[test]
    fn test_patch_clears_nullable_fields() {
        let mut task = sample_task();
        TaskPatch {
            category_id: Some(None),
            description: Some(None),
            ..Default::default()
        }
        .apply(&mut task);

        assert!(task.category_id.is_none());
        assert!(task.description.is_none());
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn test_new_task_validation() {
        let mut new = NewTask::new("   ");
        assert!(matches!(new.validate(), Err(StoreError::Validation { field: "title", .. })));

        new.title = "Pay rent".to_string();
        assert!(matches!(new.validate(), Err(StoreError::Validation { field: "dueDate", .. })));

        new.due_date = Some(Utc::now());
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_new_category_validation() {
        assert!(NewCategory::new("Errands", "#abc").validate().is_ok());
        assert!(NewCategory::new("Errands", "#00bcd4").validate().is_ok());
        assert!(NewCategory::new("", "#00bcd4").validate().is_err());
        assert!(NewCategory::new("Errands", "blue").validate().is_err());
        assert!(NewCategory::new("Errands", "#12345g").validate().is_err());
    }

    #[test]
    fn test_subtask_progress() {
        let mut task = sample_task();
        task.sub_tasks.push(SubTask::new("Draft slides"));
        assert_eq!(task.subtask_progress(), (1, 2));
    }

    #[test]
    fn test_default_categories() {
        let categories = default_categories();
        assert_eq!(categories.len(), 6);
        assert_eq!(categories[0].id, "work");
        assert!(categories.iter().all(|c| is_hex_color(&c.color)));
    }

    #[test]
    fn test_new_ids_are_distinct() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }
}
