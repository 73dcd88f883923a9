// Persisted record trait for task-store collections

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use tracing::warn;

use crate::models::{Category, Task};

/// Core trait that any persisted collection element must implement
pub trait Record: Serialize + DeserializeOwned + Clone + 'static {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Last change timestamp, if the record tracks one
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Collection name for this record type (e.g., "tasks")
    /// Doubles as the key the collection is stored under.
    fn collection_name() -> &'static str
    where
        Self: Sized;
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.last_activity())
    }

    fn collection_name() -> &'static str {
        "tasks"
    }
}

impl Record for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "categories"
    }
}

/// Collapse records sharing an id, keeping the latest version of each
///
/// The newest `updated_at` wins; on a tie (or no timestamp) the later entry
/// wins. The survivor takes the position of the first occurrence.
pub fn dedup_latest<T: Record>(records: Vec<T>) -> Vec<T> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(records.len());

    for record in records {
        match slots.get(record.id()) {
            Some(&slot) => {
                warn!(
                    collection = T::collection_name(),
                    id = record.id(),
                    "Duplicate id, keeping latest version"
                );
                if record.updated_at() >= out[slot].updated_at() {
                    out[slot] = record;
                }
            }
            None => {
                slots.insert(record.id().to_string(), out.len());
                out.push(record);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestRecord {
        id: String,
        name: String,
        updated_at: Option<DateTime<Utc>>,
    }

    impl Record for TestRecord {
        fn id(&self) -> &str {
            &self.id
        }

        fn updated_at(&self) -> Option<DateTime<Utc>> {
            self.updated_at
        }

        fn collection_name() -> &'static str {
            "test"
        }
    }

    fn rec(id: &str, name: &str, hour: Option<u32>) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            name: name.to_string(),
            updated_at: hour.map(|h| Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Task::collection_name(), "tasks");
        assert_eq!(Category::collection_name(), "categories");
        assert_eq!(TestRecord::collection_name(), "test");
    }

    #[test]
    fn test_dedup_keeps_newest_version_in_first_position() {
        let records = vec![rec("a", "v1", Some(1)), rec("b", "only", None), rec("a", "v2", Some(5))];

        let deduped = dedup_latest(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "a");
        assert_eq!(deduped[0].name, "v2");
        assert_eq!(deduped[1].id, "b");
    }

    #[test]
    fn test_dedup_older_duplicate_loses() {
        let records = vec![rec("a", "new", Some(9)), rec("a", "old", Some(2))];
        let deduped = dedup_latest(records);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].name, "new");
    }

    #[test]
    fn test_dedup_without_timestamps_keeps_last() {
        let records = vec![rec("a", "first", None), rec("a", "second", None)];
        let deduped = dedup_latest(records);
        assert_eq!(deduped[0].name, "second");
    }
}
