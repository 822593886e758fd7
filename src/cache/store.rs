//! Key-value storage backends.
//!
//! `MemoryStore` stands in for session-scoped storage and `FileStore` for
//! storage that persists across sessions. `UnavailableStore` models storage
//! that is disabled outright.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const ENTRY_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage quota exceeded: {needed} bytes needed, {remaining} remaining")]
    Quota { needed: usize, remaining: usize },
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
}

/// String key-value storage with the same contract as browser storage.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Session-scoped storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the total size of keys and values, rejecting writes past it.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "memory_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(rw_read(&self.entries, SOURCE, "memory_read")
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = rw_write(&self.entries, SOURCE, "memory_write");

        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let remaining = quota.saturating_sub(used);
            if needed > remaining {
                return Err(StorageError::Quota { needed, remaining });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        rw_write(&self.entries, SOURCE, "memory_remove").remove(key);
        Ok(())
    }
}

/// Persistent storage: one file per key inside a directory.
///
/// File names are the SHA-256 of the key so arbitrary keys (URLs, handles)
/// map to safe paths. Writes go through a temp file and an atomic rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let name = hex::encode(hasher.finalize());
        self.directory.join(format!("{name}.{ENTRY_EXTENSION}"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut temp = NamedTempFile::new_in(&self.directory)?;
        io::Write::write_all(&mut temp, value.as_bytes())?;
        temp.persist(self.entry_path(key))
            .map_err(|err| StorageError::Io(err.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Storage that is switched off: every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}
