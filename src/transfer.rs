// JSON export and import documents

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::models::{Category, Task};

/// Snapshot of both collections plus the moment it was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub export_date: DateTime<Utc>,
}

impl ExportData {
    /// Indented JSON document, as written to export files
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn file_name(&self) -> String {
        export_file_name(self.export_date.date_naive())
    }
}

/// `task-manager-export-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("task-manager-export-{}.json", date.format("%Y-%m-%d"))
}

/// Collections to import; an absent collection is left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
}

impl ImportPayload {
    /// Parse and structurally check an import document
    ///
    /// Rejects text that is not a JSON object and objects that carry
    /// neither `tasks` nor `categories`.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| StoreError::MalformedImport(format!("not valid JSON: {}", e)))?;

        let Some(object) = value.as_object() else {
            return Err(StoreError::MalformedImport("expected a JSON object".to_string()));
        };

        let present = |key: &str| object.get(key).is_some_and(|v| !v.is_null());
        if !present("tasks") && !present("categories") {
            return Err(StoreError::MalformedImport(
                "document has neither 'tasks' nor 'categories'".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| StoreError::MalformedImport(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_none() && self.categories.is_none()
    }
}

impl From<ExportData> for ImportPayload {
    fn from(data: ExportData) -> Self {
        Self {
            tasks: Some(data.tasks),
            categories: Some(data.categories),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_categories;
    use chrono::TimeZone;

    fn sample_export() -> ExportData {
        ExportData {
            tasks: vec![Task {
                id: "t1".to_string(),
                title: "Backup documents".to_string(),
                description: None,
                due_date: Some(Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap()),
                priority: crate::models::Priority::High,
                status: crate::models::Status::Pending,
                category_id: Some("personal".to_string()),
                created_at: Utc.with_ymd_and_hms(2025, 2, 24, 9, 0, 0).unwrap(),
                updated_at: None,
                sub_tasks: Vec::new(),
                notes: Some("cloud + usb".to_string()),
            }],
            categories: default_categories(),
            export_date: Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(sample_export().file_name(), "task-manager-export-2025-03-10.json");
    }

    #[test]
    fn test_pretty_json_shape() {
        let text = sample_export().to_pretty_json().unwrap();
        assert!(text.contains("\n  \"tasks\": ["));
        assert!(text.contains("\"exportDate\": \"2025-03-10T15:30:00Z\""));
        assert!(text.contains("\"categoryId\": \"personal\""));
    }

    #[test]
    fn test_exported_document_imports_back() {
        let export = sample_export();
        let payload = ImportPayload::from_json(&export.to_pretty_json().unwrap()).unwrap();
        assert_eq!(payload.tasks.as_ref(), Some(&export.tasks));
        assert_eq!(payload.categories.as_ref(), Some(&export.categories));
    }

    #[test]
    fn test_partial_payload() {
        let payload = ImportPayload::from_json(r##"{"categories":[{"id":"x","name":"X","color":"#fff"}]}"##).unwrap();
        assert!(payload.tasks.is_none());
        assert_eq!(payload.categories.unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_non_json() {
        let err = ImportPayload::from_json("tasks: []").unwrap_err();
        assert!(matches!(err, StoreError::MalformedImport(_)));
    }

    #[test]
    fn test_rejects_documents_without_collections() {
        for text in [r#"{"theme":"dark"}"#, r#"{"tasks":null}"#, "[1,2,3]"] {
            let err = ImportPayload::from_json(text).unwrap_err();
            assert!(matches!(err, StoreError::MalformedImport(_)), "accepted {}", text);
        }
    }

    #[test]
    fn test_rejects_wrongly_typed_collections() {
        let err = ImportPayload::from_json(r#"{"tasks":"nope"}"#).unwrap_err();
        assert!(matches!(err, StoreError::MalformedImport(_)));
    }
}
