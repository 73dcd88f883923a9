// Synchronous key-value backends

use fs2::FileExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Key holding the light/dark preference; never touched by the task store
pub const THEME_KEY: &str = "theme";

/// String-keyed synchronous storage (get / set / remove)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-process storage
///
/// Clones share the same entries, so two handles behave like two views of
/// one origin's storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One file per key inside a directory
///
/// Writes go to a temp file that is renamed over the target while an
/// exclusive lock on `<key>.lock` is held.
#[derive(Debug)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::storage(dir.display().to_string(), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn lock(&self, key: &str) -> io::Result<File> {
        let lock_path = self.dir.join(format!("{}.lock", key));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn write_locked(&self, key: &str, path: &Path, value: &str) -> io::Result<()> {
        let lock = self.lock(key)?;

        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;

        FileExt::unlock(&lock)?;
        Ok(())
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::storage(key, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        debug!(key, bytes = value.len(), "FileKv::set");
        self.write_locked(key, &path, value)
            .map_err(|e| StoreError::storage(key, e))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::storage(key, e)),
        }
    }
}

/// Keys become file names, so keep them to a safe alphabet
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::storage(key, "key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(StoreError::storage(key, "key too long (max 64 chars)"));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(StoreError::storage(key, "key must be alphanumeric with _/-"));
    }
    Ok(())
}
