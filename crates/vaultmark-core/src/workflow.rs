//! Password lifecycle transitions.
//!
//! Setting, changing and removing a category password each rewrite every
//! bookmark of the category. All three follow the same shape: take the
//! category guard, load, check the precondition, verify, derive, transform
//! every record in memory, and only then commit the category and its
//! bookmarks as one logical write. A failure at any step before the commit
//! leaves the store untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use secrecy::SecretString;
use uuid::Uuid;

use crate::crypto::{
    derive_key_blocking, generate_salt, validate_password, KdfParams, PasswordAdvice,
    PasswordVerifier,
};
use crate::error::{Result, VaultError};
use crate::lock::{open_all, CategoryLockController};
use crate::model::{Bookmark, BookmarkContent, DecryptedBookmark, Protection};
use crate::storage::{Collections, Repository};

/// Orchestrates set / change / remove password.
pub struct ReEncryptionWorkflow {
    repo: Arc<Repository>,
    locks: Arc<CategoryLockController>,
    kdf: KdfParams,
}

impl ReEncryptionWorkflow {
    /// `kdf` is the work factor for newly protected categories.
    pub fn new(repo: Arc<Repository>, locks: Arc<CategoryLockController>, kdf: KdfParams) -> Self {
        Self { repo, locks, kdf }
    }

    /// Protect an unprotected category, sealing all of its bookmarks.
    pub async fn set_password(
        &self,
        category_id: Uuid,
        new_password: &SecretString,
    ) -> Result<PasswordAdvice> {
        let advice = validate_password(new_password)?;
        let _guard = self.locks.guard(category_id).await;

        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;
        if category.is_protected() {
            return Err(VaultError::InvalidState(format!(
                "\"{}\" already has a password",
                category.name
            )));
        }
        tracing::info!(%category_id, "setting category password");

        let current: Vec<Bookmark> = collections.bookmarks_in(category_id).cloned().collect();
        let protection = self.new_protection(new_password);
        let key = derive_key_blocking(new_password, &protection.salt, protection.kdf).await?;

        let cipher = self.locks.cipher();
        let sealed = current
            .iter()
            .map(|bookmark| {
                let secret = bookmark.plain().ok_or_else(|| {
                    VaultError::InvalidState(format!(
                        "bookmark {} is sealed inside an unprotected category",
                        bookmark.id
                    ))
                })?;
                let record = cipher.seal(secret, &key)?;
                Ok(bookmark.with_content(BookmarkContent::Sealed(record)))
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|err| tracing::warn!(%category_id, error = %err, "set password aborted"))?;

        self.commit(category_id, &current, sealed, Some(protection))
            .await?;
        self.locks.invalidate(category_id);
        tracing::info!(%category_id, "category password set");
        Ok(advice)
    }

    /// Re-key a protected category under a new password and fresh salt.
    pub async fn change_password(
        &self,
        category_id: Uuid,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<PasswordAdvice> {
        let advice = validate_password(new_password)?;
        let _guard = self.locks.guard(category_id).await;

        let collections = self.repo.load().await?;
        let (current, decrypted) = self
            .open_protected(&collections, category_id, old_password)
            .await?;
        tracing::info!(%category_id, "changing category password");

        let protection = self.new_protection(new_password);
        let key = derive_key_blocking(new_password, &protection.salt, protection.kdf).await?;

        let cipher = self.locks.cipher();
        let resealed = current
            .iter()
            .zip(&decrypted)
            .map(|(bookmark, plain)| {
                let record = cipher.seal(&plain.secret(), &key)?;
                Ok(bookmark.with_content(BookmarkContent::Sealed(record)))
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|err| {
                tracing::warn!(%category_id, error = %err, "change password aborted")
            })?;

        self.commit(category_id, &current, resealed, Some(protection))
            .await?;
        self.locks.invalidate(category_id);
        tracing::info!(%category_id, "category password changed");
        Ok(advice)
    }

    /// Unprotect a category, restoring every bookmark to plaintext.
    pub async fn remove_password(&self, category_id: Uuid, password: &SecretString) -> Result<()> {
        let _guard = self.locks.guard(category_id).await;

        let collections = self.repo.load().await?;
        let (current, decrypted) = self
            .open_protected(&collections, category_id, password)
            .await?;
        tracing::info!(%category_id, "removing category password");

        let opened = current
            .iter()
            .zip(decrypted)
            .map(|(bookmark, plain)| bookmark.with_content(BookmarkContent::Plain(plain.secret())))
            .collect();

        self.commit(category_id, &current, opened, None).await?;
        self.locks.invalidate(category_id);
        tracing::info!(%category_id, "category password removed");
        Ok(())
    }

    fn new_protection(&self, password: &SecretString) -> Protection {
        Protection {
            verifier: PasswordVerifier::compute(password),
            salt: generate_salt(),
            kdf: self.kdf,
        }
    }

    /// Check that the category is protected, verify `password`, and open
    /// every bookmark with the derived key.
    async fn open_protected(
        &self,
        collections: &Collections,
        category_id: Uuid,
        password: &SecretString,
    ) -> Result<(Vec<Bookmark>, Vec<DecryptedBookmark>)> {
        let category = collections.require_category(category_id)?;
        let protection = category.protection.as_ref().ok_or_else(|| {
            VaultError::InvalidState(format!("\"{}\" has no password", category.name))
        })?;

        if let Err(err) = protection.verifier.verify(password) {
            tracing::warn!(%category_id, "password change rejected: incorrect password");
            return Err(err);
        }

        let current: Vec<Bookmark> = collections.bookmarks_in(category_id).cloned().collect();
        let key = derive_key_blocking(password, &protection.salt, protection.kdf).await?;
        let decrypted = open_all(self.locks.cipher(), current.iter(), &key).inspect_err(|err| {
            tracing::error!(%category_id, error = %err, "re-encryption aborted: bookmark failed to open")
        })?;

        Ok((current, decrypted))
    }

    /// Swap in the transformed bookmarks and the new protection in one commit.
    ///
    /// The category must still hold exactly the bookmarks that were
    /// transformed; anything else aborts without writing.
    async fn commit(
        &self,
        category_id: Uuid,
        expected: &[Bookmark],
        replacements: Vec<Bookmark>,
        protection: Option<Protection>,
    ) -> Result<()> {
        let expected: HashSet<Uuid> = expected.iter().map(|b| b.id).collect();

        self.repo
            .update(move |collections| {
                let present: HashSet<Uuid> = collections
                    .bookmarks_in(category_id)
                    .map(|b| b.id)
                    .collect();
                if present != expected {
                    return Err(VaultError::InvalidState(
                        "category bookmarks changed during re-encryption".to_string(),
                    ));
                }

                let mut replacements: HashMap<Uuid, Bookmark> =
                    replacements.into_iter().map(|b| (b.id, b)).collect();
                for slot in collections.bookmarks.iter_mut() {
                    if let Some(next) = replacements.remove(&slot.id) {
                        *slot = next;
                    }
                }

                let category = collections
                    .category_mut(category_id)
                    .ok_or_else(|| VaultError::NotFound(format!("Category {}", category_id)))?;
                category.protection = protection;
                Ok(())
            })
            .await
    }
}
