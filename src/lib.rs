// taskkeep - Personal task store over a pluggable key-value backend

pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod kv;
pub mod models;
pub mod record;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod theme;
pub mod transfer;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use error::{Result, StoreError};
pub use filter::{DueBucket, Filter, SortKey, sort_tasks};
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use models::{Category, CategoryPatch, NewCategory, NewTask, Priority, Status, SubTask, Task, TaskPatch};
pub use record::Record;
pub use sqlite::SqliteKv;
pub use stats::{Activity, ActivityKind, TaskStatistics};
pub use store::TaskStore;
pub use theme::Theme;
pub use transfer::{ExportData, ImportPayload};
