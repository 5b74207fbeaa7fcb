// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Key/value backends for persisted session state.

use super::ClientError;
use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// String key/value store, the analog of browser local storage.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `{key}.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    /// Write to a sibling temp file and rename, so readers never see a partial blob.
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir).map_err(|e| ClientError::Storage(e.to_string()))?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("foodsave-storage-{}", std::process::id()));
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.get("auth-storage").unwrap(), None);
        storage.set("auth-storage", "{\"a\":1}").unwrap();
        assert_eq!(
            storage.get("auth-storage").unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        storage.remove("auth-storage").unwrap();
        assert_eq!(storage.get("auth-storage").unwrap(), None);
        // Removing twice is fine
        storage.remove("auth-storage").unwrap();

        let _ = fs::remove_dir_all(&dir);
    }
}
