// Error types for the task store

use thiserror::Error;

/// Errors surfaced by the task store and its collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key-value backend failed to read, write or remove a key.
    #[error("storage error on key '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A collection could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An import document was not JSON or carried neither collection.
    #[error("malformed import: {0}")]
    MalformedImport(String),

    /// Form-level validation failed for one field.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
}

impl StoreError {
    /// Wrap a backend failure for the given key
    pub fn storage<E>(key: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Storage {
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True when the error came from the persistence layer
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Result type for task store operations
pub type Result<T> = std::result::Result<T, StoreError>;
