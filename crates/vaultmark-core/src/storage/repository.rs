//! Single commit path for the persisted collections.
//!
//! [`Repository::update`] reloads the collections, applies a mutation in
//! memory, and writes back only the collections that changed. On stores
//! without atomic batches the writes go out as bookmarks, then the domain
//! map, then categories, and earlier writes are rolled back if a later one
//! fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::records::{
    decode_bookmarks, decode_categories, decode_domain_map, encode_bookmarks, encode_categories,
    encode_domain_map,
};
use super::traits::{
    PersistentStore, StoreMap, ALL_KEYS, BOOKMARKS_KEY, CATEGORIES_KEY, DOMAIN_MAP_KEY,
};
use crate::error::{Result, VaultError};
use crate::model::{Bookmark, Category};

/// Write order on stores without atomic batches. The protection state in
/// `categories` goes last so an interrupted commit leaves the previous
/// category state describing the bookmarks still on disk.
///
/// A failed write is rolled back, but a process crash between the
/// `bookmarks` and `categories` writes is not. If that happens while a
/// password is being set, the sealed bookmarks are on disk without the
/// salt and KDF parameters needed to open them. Use a store with atomic
/// batches (SQLite) when protected categories matter.
const COMMIT_ORDER: [&str; 3] = [BOOKMARKS_KEY, DOMAIN_MAP_KEY, CATEGORIES_KEY];

/// Decoded contents of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
    pub domain_map: BTreeMap<String, Uuid>,
}

impl Collections {
    pub fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_mut(&mut self, id: Uuid) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    pub fn require_category(&self, id: Uuid) -> Result<&Category> {
        self.category(id)
            .ok_or_else(|| VaultError::NotFound(format!("Category {}", id)))
    }

    /// Bookmarks of one category, in stored order.
    pub fn bookmarks_in(&self, category_id: Uuid) -> impl Iterator<Item = &Bookmark> {
        self.bookmarks
            .iter()
            .filter(move |b| b.category_id == category_id)
    }

    fn decode(mut raw: StoreMap) -> Result<Self> {
        Ok(Self {
            categories: decode_categories(raw.remove(CATEGORIES_KEY))?,
            bookmarks: decode_bookmarks(raw.remove(BOOKMARKS_KEY))?,
            domain_map: decode_domain_map(raw.remove(DOMAIN_MAP_KEY))?,
        })
    }

    fn encode(&self) -> Result<StoreMap> {
        Ok(StoreMap::from([
            (CATEGORIES_KEY.to_string(), encode_categories(&self.categories)?),
            (BOOKMARKS_KEY.to_string(), encode_bookmarks(&self.bookmarks)?),
            (DOMAIN_MAP_KEY.to_string(), encode_domain_map(&self.domain_map)?),
        ]))
    }
}

/// Serialized access to a [`PersistentStore`].
pub struct Repository {
    store: Arc<dyn PersistentStore>,
    write_lock: Mutex<()>,
}

impl Repository {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Create empty collections for any key that is missing.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let existing = self.store.get(&ALL_KEYS).await?;

        let mut missing = StoreMap::new();
        for key in ALL_KEYS {
            if !existing.contains_key(key) {
                let empty = if key == DOMAIN_MAP_KEY {
                    serde_json::json!({})
                } else {
                    serde_json::json!([])
                };
                missing.insert(key.to_string(), empty);
            }
        }

        if !missing.is_empty() {
            tracing::info!(keys = ?missing.keys().collect::<Vec<_>>(), "initializing store");
            self.store.set(missing).await?;
        }
        Ok(())
    }

    /// Read and decode everything.
    pub async fn load(&self) -> Result<Collections> {
        Collections::decode(self.store.get(&ALL_KEYS).await?)
    }

    /// Apply `mutate` to freshly loaded collections and commit the result.
    ///
    /// Nothing is written if `mutate` returns an error.
    pub async fn update<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Collections) -> Result<T>,
    {
        let _guard = self.write_lock.lock().await;

        let prior = self.store.get(&ALL_KEYS).await?;
        let mut collections = Collections::decode(prior.clone())?;
        let outcome = mutate(&mut collections)?;

        let changed: StoreMap = collections
            .encode()?
            .into_iter()
            .filter(|(key, value)| prior.get(key) != Some(value))
            .collect();

        if !changed.is_empty() {
            self.commit(changed, &prior).await?;
        }
        Ok(outcome)
    }

    async fn commit(&self, mut changed: StoreMap, prior: &StoreMap) -> Result<()> {
        if self.store.atomic_batches() {
            tracing::debug!(keys = changed.len(), "committing batch");
            return self.store.set(changed).await;
        }

        let mut written: Vec<&str> = Vec::new();
        for key in COMMIT_ORDER {
            let Some(value) = changed.remove(key) else {
                continue;
            };
            tracing::debug!(key, "committing collection");
            if let Err(err) = self
                .store
                .set(StoreMap::from([(key.to_string(), value)]))
                .await
            {
                tracing::error!(key, error = %err, "commit failed; rolling back");
                self.roll_back(&written, prior).await;
                return Err(err);
            }
            written.push(key);
        }
        Ok(())
    }

    async fn roll_back(&self, written: &[&str], prior: &StoreMap) {
        for key in written.iter().rev() {
            let restored = match prior.get(*key) {
                Some(value) => {
                    self.store
                        .set(StoreMap::from([(key.to_string(), value.clone())]))
                        .await
                }
                None => self.store.remove(&[*key]).await,
            };
            if let Err(err) = restored {
                tracing::error!(key = *key, error = %err, "rollback failed");
            }
        }
    }
}
