//! Runtime lock state of protected categories.
//!
//! [`CategoryLockController`] is the only holder of derived keys and
//! decrypted records. A protected category starts `Locked`, passes through
//! `Unlocking` while its password is checked, and is `Unlocked` once every
//! one of its bookmarks has been opened. Any failure along the way leaves
//! the category as it was and caches nothing.
//!
//! The controller also hands out per-category guards. Every operation that
//! touches a category's password state or sealed records holds that
//! category's guard for its whole duration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::crypto::{derive_key_blocking, DerivedKey, RecordCipher};
use crate::error::{Result, VaultError};
use crate::model::{Bookmark, BookmarkContent, Category, DecryptedBookmark, LockState};
use crate::storage::Repository;

/// Exclusive access to one category.
pub type CategoryGuard = OwnedMutexGuard<()>;

enum Session {
    Unlocking,
    Unlocked {
        key: DerivedKey,
        records: Vec<DecryptedBookmark>,
    },
}

/// Owns the key and plaintext caches for every unlocked category.
pub struct CategoryLockController {
    repo: Arc<Repository>,
    cipher: Arc<dyn RecordCipher>,
    sessions: Mutex<HashMap<Uuid, Session>>,
    guards: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl CategoryLockController {
    pub fn new(repo: Arc<Repository>, cipher: Arc<dyn RecordCipher>) -> Self {
        Self {
            repo,
            cipher,
            sessions: Mutex::new(HashMap::new()),
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to a category.
    ///
    /// Slots nobody holds or waits on are dropped here, so ids of deleted
    /// categories do not accumulate.
    pub async fn guard(&self, category_id: Uuid) -> CategoryGuard {
        let slot = {
            let mut guards = self.guards.lock();
            guards.retain(|_, slot| Arc::strong_count(slot) > 1);
            guards
                .entry(category_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Guards for several categories, acquired in id order.
    pub async fn guard_all(&self, category_ids: &[Uuid]) -> Vec<CategoryGuard> {
        let mut ids = category_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut held = Vec::with_capacity(ids.len());
        for id in ids {
            held.push(self.guard(id).await);
        }
        held
    }

    pub fn state(&self, category: &Category) -> LockState {
        if !category.is_protected() {
            return LockState::Unprotected;
        }
        match self.sessions.lock().get(&category.id) {
            None => LockState::Locked,
            Some(Session::Unlocking) => LockState::Unlocking,
            Some(Session::Unlocked { .. }) => LockState::Unlocked,
        }
    }

    /// Verify `password` and open every bookmark of the category.
    ///
    /// Unprotected categories succeed without checking anything. On success
    /// the decrypted records are returned and cached.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Authentication`] if the password does not match
    /// - [`VaultError::Decryption`] if any bookmark fails to open; nothing
    ///   is cached in that case
    pub async fn unlock(
        &self,
        category_id: Uuid,
        password: &SecretString,
    ) -> Result<Vec<DecryptedBookmark>> {
        let _guard = self.guard(category_id).await;

        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;
        let Some(protection) = &category.protection else {
            return plaintext_records(collections.bookmarks_in(category_id));
        };

        let pending = PendingUnlock::begin(&self.sessions, category_id);

        if let Err(err) = protection.verifier.verify(password) {
            tracing::warn!(%category_id, "unlock rejected: incorrect password");
            return Err(err);
        }

        let key = derive_key_blocking(password, &protection.salt, protection.kdf).await?;
        let records = match open_all(
            self.cipher.as_ref(),
            collections.bookmarks_in(category_id),
            &key,
        ) {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(%category_id, error = %err, "unlock aborted: bookmark failed to open");
                return Err(err);
            }
        };

        pending.complete(key, records.clone());
        tracing::info!(%category_id, count = records.len(), "category unlocked");
        Ok(records)
    }

    /// Drop the cached key and records. Idempotent.
    pub async fn lock(&self, category_id: Uuid) {
        let _guard = self.guard(category_id).await;
        self.invalidate(category_id);
    }

    /// Lock every unlocked category.
    pub async fn lock_all(&self) {
        let ids: Vec<Uuid> = self.sessions.lock().keys().copied().collect();
        for id in ids {
            self.lock(id).await;
        }
    }

    /// Decrypted records of an unlocked category.
    pub fn cached_records(&self, category_id: Uuid) -> Option<Vec<DecryptedBookmark>> {
        match self.sessions.lock().get(&category_id) {
            Some(Session::Unlocked { records, .. }) => Some(records.clone()),
            _ => None,
        }
    }

    /// Drop cached state without taking the guard. For callers already holding it.
    pub(crate) fn invalidate(&self, category_id: Uuid) {
        if self.sessions.lock().remove(&category_id).is_some() {
            tracing::info!(%category_id, "category locked");
        }
    }

    /// Run `f` with the cached key of an unlocked category.
    pub(crate) fn with_key<T>(&self, category_id: Uuid, f: impl FnOnce(&DerivedKey) -> T) -> Option<T> {
        match self.sessions.lock().get(&category_id) {
            Some(Session::Unlocked { key, .. }) => Some(f(key)),
            _ => None,
        }
    }

    pub(crate) fn append_cached(&self, category_id: Uuid, record: DecryptedBookmark) {
        if let Some(Session::Unlocked { records, .. }) = self.sessions.lock().get_mut(&category_id) {
            records.push(record);
        }
    }

    pub(crate) fn forget_records(&self, category_id: Uuid, ids: &HashSet<Uuid>) {
        if let Some(Session::Unlocked { records, .. }) = self.sessions.lock().get_mut(&category_id) {
            records.retain(|r| !ids.contains(&r.id));
        }
    }

    pub(crate) fn cipher(&self) -> &dyn RecordCipher {
        self.cipher.as_ref()
    }
}

/// Marks a category `Unlocking` and restores the previous state on drop
/// unless [`complete`](Self::complete) was called. Covers early returns and
/// a dropped future alike.
struct PendingUnlock<'a> {
    sessions: &'a Mutex<HashMap<Uuid, Session>>,
    category_id: Uuid,
    previous: Option<Session>,
    done: bool,
}

impl<'a> PendingUnlock<'a> {
    fn begin(sessions: &'a Mutex<HashMap<Uuid, Session>>, category_id: Uuid) -> Self {
        let previous = sessions.lock().insert(category_id, Session::Unlocking);
        Self {
            sessions,
            category_id,
            previous,
            done: false,
        }
    }

    fn complete(mut self, key: DerivedKey, records: Vec<DecryptedBookmark>) {
        self.sessions
            .lock()
            .insert(self.category_id, Session::Unlocked { key, records });
        self.done = true;
    }
}

impl Drop for PendingUnlock<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut sessions = self.sessions.lock();
        match self.previous.take() {
            Some(previous @ Session::Unlocked { .. }) => {
                sessions.insert(self.category_id, previous);
            }
            _ => {
                sessions.remove(&self.category_id);
            }
        }
    }
}

/// Open every bookmark with `key`, all or nothing.
///
/// A plaintext bookmark inside a protected category is reported as a
/// decryption failure: it means the stored state is inconsistent.
pub(crate) fn open_all<'a>(
    cipher: &dyn RecordCipher,
    bookmarks: impl Iterator<Item = &'a Bookmark>,
    key: &DerivedKey,
) -> Result<Vec<DecryptedBookmark>> {
    bookmarks
        .map(|bookmark| match &bookmark.content {
            BookmarkContent::Sealed(sealed) => {
                let secret = cipher.open(sealed, key).map_err(|err| match err {
                    VaultError::Decryption(reason) => {
                        VaultError::Decryption(format!("bookmark {}: {}", bookmark.id, reason))
                    }
                    other => other,
                })?;
                Ok(DecryptedBookmark::from_parts(bookmark, secret))
            }
            BookmarkContent::Plain(_) => Err(VaultError::Decryption(format!(
                "bookmark {} is stored in plaintext inside a protected category",
                bookmark.id
            ))),
        })
        .collect()
}

/// Records of an unprotected category.
pub(crate) fn plaintext_records<'a>(
    bookmarks: impl Iterator<Item = &'a Bookmark>,
) -> Result<Vec<DecryptedBookmark>> {
    bookmarks
        .map(|bookmark| match &bookmark.content {
            BookmarkContent::Plain(secret) => {
                Ok(DecryptedBookmark::from_parts(bookmark, secret.clone()))
            }
            BookmarkContent::Sealed(_) => Err(VaultError::InvalidState(format!(
                "bookmark {} is sealed inside an unprotected category",
                bookmark.id
            ))),
        })
        .collect()
}
