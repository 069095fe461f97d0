//! In-process store.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{PersistentStore, StoreMap};
use crate::error::Result;

/// A [`PersistentStore`] backed by a map in memory.
///
/// A `set` replaces all of its keys under one lock, so batches are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<StoreMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing contents.
    pub fn with_entries(entries: StoreMap) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> StoreMap {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreMap> {
        let entries = self.entries.lock();
        Ok(keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect())
    }

    async fn set(&self, batch: StoreMap) -> Result<()> {
        self.entries.lock().extend(batch);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    fn atomic_batches(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_only_present_keys() {
        let store = MemoryStore::new();
        store
            .set(StoreMap::from([("a".to_string(), json!([1]))]))
            .await
            .unwrap();

        let got = store.get(&["a", "b"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!([1]));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemoryStore::new();
        store
            .set(StoreMap::from([("a".to_string(), json!({}))]))
            .await
            .unwrap();
        store.remove(&["a", "missing"]).await.unwrap();
        store.remove(&["a"]).await.unwrap();
        assert!(store.snapshot().is_empty());
    }
}
