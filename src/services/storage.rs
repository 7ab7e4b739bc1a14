//! Dashboard state persistence.
//!
//! A `StorageBackend` is a small string key/value medium. `StorageService`
//! stores the dashboard state as JSON under one fixed key and swallows every
//! failure: errors are logged, reads degrade to "nothing stored".

use crate::types::DashboardState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Key the dashboard state is stored under.
pub const STORAGE_KEY: &str = "project-dashboard-state";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key/value storage medium.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write to a sibling temp file first so a crash never leaves a torn entry
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }
}

/// Persists [`DashboardState`] when a storage medium is available.
///
/// A headless service (no backend) loads nothing and writes nothing.
#[derive(Clone)]
pub struct StorageService {
    backend: Option<Arc<dyn StorageBackend>>,
    key: String,
}

impl StorageService {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend: Some(backend),
            key: STORAGE_KEY.to_string(),
        }
    }

    /// Service for contexts without a storage medium.
    pub fn headless() -> Self {
        Self {
            backend: None,
            key: STORAGE_KEY.to_string(),
        }
    }

    /// Store under a different key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn save_state(&self, state: &DashboardState) {
        let Some(backend) = &self.backend else {
            return;
        };

        let result = serde_json::to_string(state)
            .map_err(StorageError::from)
            .and_then(|json| backend.set_item(&self.key, &json));
        match result {
            Ok(()) => debug!(key = %self.key, "Dashboard state saved"),
            Err(e) => error!(key = %self.key, "Error saving dashboard state: {}", e),
        }
    }

    pub fn load_state(&self) -> Option<DashboardState> {
        let backend = self.backend.as_ref()?;

        let stored = match backend.get_item(&self.key) {
            Ok(stored) => stored?,
            Err(e) => {
                error!(key = %self.key, "Error loading dashboard state: {}", e);
                return None;
            }
        };
        if stored.trim().is_empty() {
            return None;
        }

        match serde_json::from_str(&stored) {
            Ok(state) => Some(state),
            Err(e) => {
                error!(key = %self.key, "Error parsing stored dashboard state: {}", e);
                None
            }
        }
    }

    pub fn clear_state(&self) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.remove_item(&self.key) {
            error!(key = %self.key, "Error clearing dashboard state: {}", e);
        }
    }
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("available", &self.is_available())
            .field("key", &self.key)
            .finish()
    }
}
