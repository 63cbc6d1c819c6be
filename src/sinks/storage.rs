//! Durable key-value storage sinks
//!
//! The event store mirrors its snapshot through a [`StorageSink`]. Two stock
//! implementations are provided: an in-process map with an optional byte quota
//! and a directory of JSON files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full, free space needed to save",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "failed to access storage",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28, EDQUOT = 122 on Linux / 69 on macOS
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Errors produced by storage sinks
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage key {key:?}: {}", .kind.user_message())]
    Io {
        key: String,
        kind: DiskErrorKind,
        #[source]
        source: std::io::Error,
    },

    #[error("storage quota exceeded writing {key:?}: {size} bytes over a quota of {quota}")]
    QuotaExceeded {
        key: String,
        size: usize,
        quota: usize,
    },

    #[error("failed to serialize event log: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

impl StorageError {
    fn io(key: &str, source: std::io::Error) -> Self {
        StorageError::Io {
            key: key.to_string(),
            kind: categorize_io_error(&source),
            source,
        }
    }
}

/// Durable storage capability
pub trait StorageSink: Send + Sync {
    /// Read the value under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing an absent key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage with an optional total byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Unlimited in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose keys and values together may not exceed `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Total bytes held across keys and values
    pub fn used_bytes(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl StorageSink for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let size = others + key.len() + value.len();
            if size > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    size,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Storage keeping one `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StorageSink for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(key, e))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| StorageError::io(key, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StorageError::io(key, e)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.read("eventLog").unwrap().is_none());

        storage.write("eventLog", "[]").unwrap();
        assert_eq!(storage.read("eventLog").unwrap().as_deref(), Some("[]"));

        storage.remove("eventLog").unwrap();
        assert!(storage.read("eventLog").unwrap().is_none());
        storage.remove("eventLog").unwrap();
    }

    #[test]
    fn test_memory_storage_survives_poisoned_lock() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        storage.write("eventLog", "[1]").unwrap();

        let poisoner = storage.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(storage.entries.is_poisoned());

        assert_eq!(storage.read("eventLog").unwrap().as_deref(), Some("[1]"));
        storage.remove("eventLog").unwrap();
        assert!(storage.read("eventLog").unwrap().is_none());
    }

    #[test]
    fn test_memory_storage_quota() {
        let storage = MemoryStorage::with_quota(16);
        storage.write("k", "0123456789").unwrap();

        let err = storage.write("k", "0123456789abcdefgh").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 16, .. }));
        // Failed write leaves the previous value
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("0123456789"));
        assert_eq!(storage.used_bytes(), 11);
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("store"));

        assert!(storage.read("eventLog").unwrap().is_none());
        storage.write("eventLog", r#"[{"a":1}]"#).unwrap();
        assert!(temp_dir.path().join("store").join("eventLog.json").exists());
        assert_eq!(
            storage.read("eventLog").unwrap().as_deref(),
            Some(r#"[{"a":1}]"#)
        );

        storage.remove("eventLog").unwrap();
        assert!(storage.read("eventLog").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_remove_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        assert!(storage.remove("nothing").is_ok());
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert!(matches!(
            storage.write("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.read(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_categorize_io_error() {
        let e = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(categorize_io_error(&e), DiskErrorKind::PermissionDenied);

        let e = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(categorize_io_error(&e), DiskErrorKind::NotFound);

        let e = std::io::Error::new(std::io::ErrorKind::Other, "odd");
        assert_eq!(categorize_io_error(&e), DiskErrorKind::Other);
    }
}
