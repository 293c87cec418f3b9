//! Durable key-value storage for the alarm list.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::StorageError;

/// a string store that survives restarts
pub trait Storage {
    /// # Errors
    /// when the value exists but cannot be read
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// when the value cannot be written, e.g. the quota is exceeded
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn check_quota(value: &str, quota: Option<u64>) -> Result<(), StorageError> {
    let needed = value.len() as u64;
    match quota {
        Some(quota) if needed > quota => Err(StorageError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

/// one `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStorage {
    #[must_use]
    pub const fn new(dir: PathBuf, quota: Option<u64>) -> Self {
        Self { dir, quota }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(value, self.quota)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(key);
        // write next to the target first so a failed write never truncates the old list
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

/// keeps everything in memory, used by tests and when no data directory exists
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<u64>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota: u64) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    pub fn set_quota(&mut self, quota: Option<u64>) {
        self.quota = quota;
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(value, self.quota)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "roosty_alarm_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = scratch_dir("round_trip");
        let mut storage = FileStorage::new(dir.clone(), None);
        assert!(storage.get("customAlarms").unwrap().is_none());
        storage.set("customAlarms", "[]").unwrap();
        assert_eq!(storage.get("customAlarms").unwrap().as_deref(), Some("[]"));
        storage.set("customAlarms", "[1]").unwrap();
        assert_eq!(storage.get("customAlarms").unwrap().as_deref(), Some("[1]"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_storage_keeps_old_value_over_quota() {
        let dir = scratch_dir("quota");
        let mut storage = FileStorage::new(dir.clone(), Some(4));
        storage.set("k", "1234").unwrap();
        assert!(matches!(
            storage.set("k", "12345"),
            Err(StorageError::QuotaExceeded { needed: 5, quota: 4 })
        ));
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("1234"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn memory_storage_enforces_quota() {
        let mut storage = MemoryStorage::with_quota(2);
        assert!(storage.set("k", "abc").is_err());
        assert!(storage.get("k").unwrap().is_none());
        storage.set_quota(None);
        storage.set("k", "abc").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("abc"));
    }
}
