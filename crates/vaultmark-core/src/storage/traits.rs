//! Key/value store contract.
//!
//! Values are whole collections encoded as JSON. A backend applies each key
//! atomically; whether one `set` call is atomic across several keys is
//! reported by [`PersistentStore::atomic_batches`].

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

/// Key holding the array of category records.
pub const CATEGORIES_KEY: &str = "categories";

/// Key holding the array of bookmark records.
pub const BOOKMARKS_KEY: &str = "bookmarks";

/// Key holding the domain → category id map.
pub const DOMAIN_MAP_KEY: &str = "domainCategoryMap";

/// Every key the library reads and writes.
pub const ALL_KEYS: [&str; 3] = [CATEGORIES_KEY, BOOKMARKS_KEY, DOMAIN_MAP_KEY];

/// A batch of key → value pairs.
pub type StoreMap = BTreeMap<String, serde_json::Value>;

/// Whole-collection key/value storage.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Fetch the given keys. Keys that were never written are absent from
    /// the result.
    async fn get(&self, keys: &[&str]) -> Result<StoreMap>;

    /// Write every entry of `entries`.
    ///
    /// # Errors
    ///
    /// On failure some keys may already have been written unless
    /// [`atomic_batches`](Self::atomic_batches) is true.
    async fn set(&self, entries: StoreMap) -> Result<()>;

    /// Delete keys. Missing keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<()>;

    /// Whether one `set` call with several keys is all-or-nothing.
    fn atomic_batches(&self) -> bool;
}
