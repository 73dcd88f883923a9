// Configuration loading
//
// Reads `config.yaml` from the user config directory. Every field has a
// default, so a missing file is the same as an empty one.

use clap::ValueEnum;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::filter::SortKey;
use crate::kv::{FileKv, MemoryKv};
use crate::sqlite::SqliteKv;
use crate::store::TaskStore;

const APP_DIR: &str = "taskkeep";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the backend's files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Which key-value backend to use
    #[serde(default)]
    pub backend: Backend,

    /// Sort order for `list` when none is given
    #[serde(default)]
    pub default_sort: SortKey,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            default_sort: SortKey::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `taskkeep.db` in the data directory
    #[default]
    Sqlite,
    /// One JSON file per key in the data directory
    File,
    /// Nothing survives the process
    Memory,
}

impl Config {
    /// `<config_dir>/taskkeep/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.yaml"))
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&text).wrap_err_with(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse YAML")
    }

    /// Open the task store on the configured backend
    pub fn open_store(&self) -> Result<TaskStore> {
        debug!(backend = ?self.backend, data_dir = ?self.data_dir, "Opening task store");
        let store = match self.backend {
            Backend::Sqlite => TaskStore::open(SqliteKv::open(&self.data_dir)?)?,
            Backend::File => TaskStore::open(FileKv::open(&self.data_dir)?)?,
            Backend::Memory => TaskStore::open(MemoryKv::new())?,
        };
        Ok(store)
    }
}
