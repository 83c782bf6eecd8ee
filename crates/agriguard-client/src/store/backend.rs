// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Durable key-value storage backends.
//!
//! Keys are dotted names such as `agriguard.session`. Values are opaque
//! strings. All backends are last-writer-wins; none of them lock across
//! handles.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

// =============================================================================
// Error
// =============================================================================

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is disabled or unreachable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure.
    #[error("Storage I/O error on '{path}': {source}")]
    Io {
        /// Affected path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "unavailable",
            StorageError::Io { .. } => "io",
            StorageError::Serialization(_) => "serialization",
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// StorageBackend Trait
// =============================================================================

/// A string key-value store shared by every handle of the same origin.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Reads a value.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Lists all keys.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns the backend name.
    fn name(&self) -> &str;
}

/// Shared storage handle.
pub type SharedStorage = Arc<dyn StorageBackend>;

// =============================================================================
// MemoryStorage
// =============================================================================

/// Process-local storage.
///
/// Clones share the same map, which is how tests model two tabs of the same
/// origin.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(StorageError::Unavailable(format!("invalid key '{}'", key)));
        }
        Ok(self.dir.join(key))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        // Write-then-rename so a concurrent reader never sees a torn record.
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, value).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "file"
    }
}

// =============================================================================
// DisabledStorage
// =============================================================================

/// Storage that is never available (private browsing, quota exhausted).
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStorage;

impl StorageBackend for DisabledStorage {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Err(StorageError::Unavailable("storage is disabled".to_string()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let tab_a = MemoryStorage::new();
        let tab_b = tab_a.clone();

        tab_a.set("agriguard.session", "record").unwrap();
        assert_eq!(tab_b.get("agriguard.session").unwrap().as_deref(), Some("record"));

        tab_b.remove("agriguard.session").unwrap();
        assert!(tab_a.is_empty());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("state")).unwrap();

        assert_eq!(storage.get("agriguard.session").unwrap(), None);
        storage.set("agriguard.session", "v1:abc").unwrap();
        storage.set("agriguard.session.tab", "x").unwrap();
        assert_eq!(storage.get("agriguard.session").unwrap().as_deref(), Some("v1:abc"));
        assert_eq!(
            storage.keys().unwrap(),
            vec!["agriguard.session".to_string(), "agriguard.session.tab".to_string()]
        );

        storage.remove("agriguard.session").unwrap();
        storage.remove("agriguard.session").unwrap();
        assert_eq!(storage.get("agriguard.session").unwrap(), None);
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(storage.set("../escape", "x").is_err());
        assert!(storage.set("a/b", "x").is_err());
    }

    #[test]
    fn test_disabled_storage_always_fails() {
        let storage = DisabledStorage;
        assert!(matches!(storage.get("k"), Err(StorageError::Unavailable(_))));
        assert!(storage.set("k", "v").is_err());
    }
}
