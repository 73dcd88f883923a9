// Task store: in-memory collections synchronized to a key-value backend

use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::dates::DayWindow;
use crate::error::Result;
use crate::filter::{self, Filter, SortKey};
use crate::kv::KeyValueStore;
use crate::models::{Category, CategoryPatch, NewCategory, NewTask, Status, SubTask, Task, TaskPatch, default_categories};
use crate::record::{Record, dedup_latest};
use crate::stats::{self, Activity, TaskStatistics};
use crate::transfer::{ExportData, ImportPayload};

/// Owner of the task and category collections
///
/// Loaded once from the backend on `open`; every mutation rewrites the
/// affected collection in full. A failed write leaves the in-memory change
/// in place, returns the error and marks the collection dirty until a later
/// write succeeds.
pub struct TaskStore {
    kv: Box<dyn KeyValueStore>,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    tasks_dirty: bool,
    categories_dirty: bool,
}

impl TaskStore {
    /// Load both collections from `kv`
    ///
    /// A missing or unparsable `tasks` entry yields an empty list; the same
    /// for `categories` yields the default categories. Read failures from the
    /// backend itself are returned.
    pub fn open<K: KeyValueStore + 'static>(kv: K) -> Result<Self> {
        let kv: Box<dyn KeyValueStore> = Box::new(kv);

        let tasks = load_collection::<Task>(kv.as_ref())?.unwrap_or_default();
        let categories = load_collection::<Category>(kv.as_ref())?.unwrap_or_else(|| {
            debug!("Seeding default categories");
            default_categories()
        });

        info!(tasks = tasks.len(), categories = categories.len(), "Task store opened");

        Ok(Self {
            kv,
            tasks,
            categories,
            tasks_dirty: false,
            categories_dirty: false,
        })
    }

    /// Get a reference to the key-value backend
    pub fn kv(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    pub fn kv_mut(&mut self) -> &mut dyn KeyValueStore {
        self.kv.as_mut()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    // ========================================================================
    // Task CRUD
    // ========================================================================

    /// Create a task with a fresh id and `createdAt = now`
    ///
    /// No validation happens here; see `NewTask::validate`.
    pub fn add_task(&mut self, new: NewTask) -> Result<Task> {
        let task = Task::from_new(new, Utc::now());
        debug!(id = %task.id, "add_task");

        self.tasks.push(task.clone());
        self.persist_tasks()?;
        Ok(task)
    }

    /// Merge `patch` into the task and stamp `updatedAt`
    ///
    /// Returns `None` without touching anything when the id is unknown.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        self.modify_task(id, |task| {
            patch.apply(task);
            Some(task.clone())
        })
    }

    /// Remove the task; unknown ids are a no-op returning `None`
    pub fn delete_task(&mut self, id: &str) -> Result<Option<Task>> {
        let Some(pos) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "delete_task: no such task");
            return Ok(None);
        };

        let removed = self.tasks.remove(pos);
        self.persist_tasks()?;
        Ok(Some(removed))
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Completed tasks go back to pending, anything else becomes completed
    pub fn toggle_complete(&mut self, id: &str) -> Result<Option<Task>> {
        self.modify_task(id, |task| {
            task.status = if task.is_completed() {
                Status::Pending
            } else {
                Status::Completed
            };
            Some(task.clone())
        })
    }

    // ========================================================================
    // Subtasks
    // ========================================================================

    pub fn add_subtask(&mut self, task_id: &str, text: &str) -> Result<Option<SubTask>> {
        self.modify_task(task_id, |task| {
            let sub = SubTask::new(text);
            task.sub_tasks.push(sub.clone());
            Some(sub)
        })
    }

    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> Result<Option<SubTask>> {
        self.modify_task(task_id, |task| {
            let sub = task.sub_tasks.iter_mut().find(|s| s.id == subtask_id)?;
            sub.completed = !sub.completed;
            Some(sub.clone())
        })
    }

    pub fn remove_subtask(&mut self, task_id: &str, subtask_id: &str) -> Result<Option<SubTask>> {
        self.modify_task(task_id, |task| {
            let pos = task.sub_tasks.iter().position(|s| s.id == subtask_id)?;
            Some(task.sub_tasks.remove(pos))
        })
    }

    // ========================================================================
    // Category CRUD
    // ========================================================================

    pub fn add_category(&mut self, new: NewCategory) -> Result<Category> {
        let category = Category::from_new(new);
        debug!(id = %category.id, "add_category");

        self.categories.push(category.clone());
        self.persist_categories()?;
        Ok(category)
    }

    pub fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Result<Option<Category>> {
        let Some(category) = self.categories.iter_mut().find(|c| c.id == id) else {
            debug!(id, "update_category: no such category");
            return Ok(None);
        };

        patch.apply(category);
        let updated = category.clone();
        self.persist_categories()?;
        Ok(Some(updated))
    }

    /// Remove the category and detach every task that referenced it
    ///
    /// Both collections are written; if both writes fail the first error is
    /// returned.
    pub fn delete_category(&mut self, id: &str) -> Result<Option<Category>> {
        let Some(pos) = self.categories.iter().position(|c| c.id == id) else {
            debug!(id, "delete_category: no such category");
            return Ok(None);
        };

        let removed = self.categories.remove(pos);

        let mut detached = 0;
        for task in self.tasks.iter_mut().filter(|t| t.category_id.as_deref() == Some(id)) {
            task.category_id = None;
            detached += 1;
        }
        debug!(id, detached, "delete_category: detached tasks");

        let categories_result = self.persist_categories();
        let tasks_result = self.persist_tasks();
        categories_result.and(tasks_result)?;

        Ok(Some(removed))
    }

    pub fn get_category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// The task's category, if it has one that still exists
    pub fn category_for(&self, task: &Task) -> Option<&Category> {
        task.category_id.as_deref().and_then(|id| self.get_category(id))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Tasks matching every set criterion, relative to the local clock
    pub fn filter_tasks(&self, filter: &Filter) -> Vec<Task> {
        self.filter_tasks_at(filter, &Local::now())
    }

    pub fn filter_tasks_at<Tz: TimeZone>(&self, filter: &Filter, now: &DateTime<Tz>) -> Vec<Task> {
        let window = DayWindow::at(now);
        self.tasks
            .iter()
            .filter(|t| filter.matches(t, &window))
            .cloned()
            .collect()
    }

    /// Sorted copy of `tasks`; see `filter::sort_tasks`
    pub fn sort_tasks(&self, tasks: &[Task], key: SortKey) -> Vec<Task> {
        filter::sort_tasks(tasks, key)
    }

    pub fn statistics(&self) -> TaskStatistics {
        self.statistics_at(&Local::now())
    }

    pub fn statistics_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> TaskStatistics {
        TaskStatistics::compute(&self.tasks, &self.categories, &DayWindow::at(now))
    }

    pub fn recent_activity(&self, limit: usize) -> Vec<Activity> {
        stats::recent_activity(&self.tasks, limit)
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// Owned snapshot of both collections
    pub fn export_data(&self) -> ExportData {
        ExportData {
            tasks: self.tasks.clone(),
            categories: self.categories.clone(),
            export_date: Utc::now(),
        }
    }

    /// Replace each collection present in the payload
    ///
    /// Entities are taken as given apart from collapsing duplicate ids.
    pub fn import_data(&mut self, payload: ImportPayload) -> Result<()> {
        let mut result = Ok(());

        if let Some(tasks) = payload.tasks {
            self.tasks = dedup_latest(tasks);
            info!(count = self.tasks.len(), "Imported tasks");
            result = result.and(self.persist_tasks());
        }

        if let Some(categories) = payload.categories {
            self.categories = dedup_latest(categories);
            info!(count = self.categories.len(), "Imported categories");
            result = result.and(self.persist_categories());
        }

        result
    }

    /// Delete the persisted `tasks` and `categories` entries
    ///
    /// Other keys (the theme) are kept and the in-memory collections are not
    /// touched; reopen the store to start from defaults.
    pub fn clear_persisted(&mut self) -> Result<()> {
        let tasks_key = Task::collection_name();
        let categories_key = Category::collection_name();

        let result = self.kv.remove(tasks_key).and(self.kv.remove(categories_key));
        match &result {
            Ok(()) => {
                self.tasks_dirty = false;
                self.categories_dirty = false;
                info!("Cleared persisted task data");
            }
            Err(e) => error!(error = %e, "Failed to clear persisted task data"),
        }
        result
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// True while some in-memory change has not reached the backend
    pub fn is_dirty(&self) -> bool {
        self.tasks_dirty || self.categories_dirty
    }

    /// Retry writing any collection whose last write failed
    pub fn flush(&mut self) -> Result<()> {
        let mut result = Ok(());
        if self.tasks_dirty {
            result = result.and(self.persist_tasks());
        }
        if self.categories_dirty {
            result = result.and(self.persist_categories());
        }
        result
    }

    /// Flush pending writes and release the backend
    ///
    /// Unsaved changes are given up after this attempt; `Drop` does not
    /// retry them.
    pub fn close(mut self) -> Result<()> {
        let result = self.flush();
        self.tasks_dirty = false;
        self.categories_dirty = false;
        result
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Stamp `updatedAt`, run `f` on the task with `id` and persist
    ///
    /// `f` sees the new stamp; when it reports no change the previous stamp
    /// is restored and nothing is written.
    fn modify_task<R>(&mut self, id: &str, f: impl FnOnce(&mut Task) -> Option<R>) -> Result<Option<R>> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "modify_task: no such task");
            return Ok(None);
        };

        let previous = task.updated_at.replace(Utc::now());
        let Some(out) = f(task) else {
            task.updated_at = previous;
            return Ok(None);
        };

        self.persist_tasks()?;
        Ok(Some(out))
    }

    fn persist_tasks(&mut self) -> Result<()> {
        let result = write_collection(self.kv.as_mut(), &self.tasks);
        settle(Task::collection_name(), &mut self.tasks_dirty, result)
    }

    fn persist_categories(&mut self) -> Result<()> {
        let result = write_collection(self.kv.as_mut(), &self.categories);
        settle(Category::collection_name(), &mut self.categories_dirty, result)
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        if !self.is_dirty() {
            return;
        }
        warn!("Task store dropped with unsaved changes, flushing");
        if let Err(e) = self.flush() {
            error!(error = %e, "Final flush failed, unsaved changes lost");
        }
    }
}

/// Read and decode one collection
///
/// `None` when the entry is absent, not JSON or not an array. Inside an
/// array, records that do not decode are skipped one by one.
fn load_collection<T: Record>(kv: &dyn KeyValueStore) -> Result<Option<Vec<T>>> {
    let key = T::collection_name();

    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key, "No stored collection");
            return Ok(None);
        }
        Err(e) => {
            error!(key, error = %e, "Failed to read stored collection");
            return Err(e);
        }
    };

    let values = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(values)) => values,
        Ok(_) => {
            warn!(key, "Stored collection is not an array, using defaults");
            return Ok(None);
        }
        Err(e) => {
            warn!(key, error = %e, "Stored collection is unparsable, using defaults");
            return Ok(None);
        }
    };

    let stored = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key, index, error = %e, "Skipping unreadable stored record");
                None
            }
        })
        .collect();

    let records = dedup_latest(records);
    debug!(key, stored, count = records.len(), "Loaded stored collection");
    Ok(Some(records))
}

fn write_collection<T: Record>(kv: &mut dyn KeyValueStore, records: &[T]) -> Result<()> {
    let key = T::collection_name();
    let json = serde_json::to_string(records)?;
    kv.set(key, &json)?;
    debug!(key, count = records.len(), "Persisted collection");
    Ok(())
}

/// Track the dirty flag for one collection and log failed writes
fn settle(key: &str, dirty: &mut bool, result: Result<()>) -> Result<()> {
    match &result {
        Ok(()) => *dirty = false,
        Err(e) => {
            *dirty = true;
            error!(key, error = %e, "Failed to persist collection, keeping in-memory state");
        }
    }
    result
}
