//! Directory of JSON files, one per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::traits::{PersistentStore, StoreMap};
use crate::error::{Result, VaultError};
use crate::fs::write_atomic;

/// A [`PersistentStore`] keeping each key in `<dir>/<key>.json`.
///
/// Every file is replaced atomically, but a `set` touching several keys
/// can be interrupted between files, so batches are not atomic.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(dir: &Path, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(VaultError::Storage(format!("Invalid store key: {:?}", key)));
        }
        Ok(dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl PersistentStore for JsonDirStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap> {
        let dir = self.dir.clone();
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

        tokio::task::spawn_blocking(move || {
            let mut found = StoreMap::new();
            for key in keys {
                let path = Self::path_for(&dir, &key)?;
                let bytes = match fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(err) if err.kind() == ErrorKind::NotFound => continue,
                    Err(err) => return Err(err.into()),
                };
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    VaultError::Storage(format!("Corrupt {}: {}", path.display(), e))
                })?;
                found.insert(key, value);
            }
            Ok(found)
        })
        .await?
    }

    async fn set(&self, entries: StoreMap) -> Result<()> {
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || {
            for (key, value) in entries {
                let path = Self::path_for(&dir, &key)?;
                let bytes = serde_json::to_vec_pretty(&value)?;
                write_atomic(&path, &bytes)?;
            }
            Ok(())
        })
        .await?
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let dir = self.dir.clone();
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();

        tokio::task::spawn_blocking(move || {
            for key in keys {
                let path = Self::path_for(&dir, &key)?;
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
            Ok(())
        })
        .await?
    }

    fn atomic_batches(&self) -> bool {
        false
    }
}
