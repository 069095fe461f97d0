//! Bookmark library facade.
//!
//! [`Library`] ties the repository, the lock controller and the password
//! workflows together and implements the everyday operations: saving a
//! page, browsing and searching categories, renaming and deleting. Password
//! prompts and confirmations come from injected collaborators.

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::SecretString;
use uuid::Uuid;

use crate::credentials::{require_password, Confirmation, CredentialProvider, PasswordPurpose};
use crate::crypto::{derive_key_blocking, AeadCipher, KdfParams, PasswordAdvice, RecordCipher};
use crate::error::{Result, VaultError};
use crate::integrity::{check_collections, IntegrityReport};
use crate::lock::{plaintext_records, CategoryLockController};
use crate::model::{
    Bookmark, BookmarkContent, BookmarkSecret, Category, CategorySummary, DecryptedBookmark,
    LockState,
};
use crate::storage::{Collections, PersistentStore, Repository};
use crate::workflow::ReEncryptionWorkflow;

/// Name given to categories when auto-creation is off.
pub const DEFAULT_CATEGORY_NAME: &str = "Uncategorized";

/// Behaviour knobs for a [`Library`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySettings {
    /// Create one category per new domain
    pub auto_create_categories: bool,

    /// Category used for every new domain when auto-creation is off
    pub default_category_name: String,

    /// Work factor for newly protected categories
    pub kdf: KdfParams,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            auto_create_categories: true,
            default_category_name: DEFAULT_CATEGORY_NAME.to_string(),
            kdf: KdfParams::default(),
        }
    }
}

/// Result of [`Library::add_bookmark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added { bookmark_id: Uuid, category_id: Uuid },
    AlreadyBookmarked,
}

/// What [`Library::manage_password`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordChange {
    Set(PasswordAdvice),
    Changed(PasswordAdvice),
    Removed,
}

/// The bookmark library.
pub struct Library {
    repo: Arc<Repository>,
    locks: Arc<CategoryLockController>,
    workflow: ReEncryptionWorkflow,
    settings: LibrarySettings,
}

impl Library {
    pub fn new(store: Arc<dyn PersistentStore>, settings: LibrarySettings) -> Self {
        Self::with_cipher(store, settings, Arc::new(AeadCipher))
    }

    /// Build a library with a custom record cipher.
    pub fn with_cipher(
        store: Arc<dyn PersistentStore>,
        settings: LibrarySettings,
        cipher: Arc<dyn RecordCipher>,
    ) -> Self {
        let repo = Arc::new(Repository::new(store));
        let locks = Arc::new(CategoryLockController::new(repo.clone(), cipher));
        let workflow = ReEncryptionWorkflow::new(repo.clone(), locks.clone(), settings.kdf);
        Self {
            repo,
            locks,
            workflow,
            settings,
        }
    }

    /// Create empty collections on first run.
    pub async fn initialize(&self) -> Result<()> {
        self.repo.initialize().await
    }

    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    pub fn locks(&self) -> &CategoryLockController {
        &self.locks
    }

    pub fn workflow(&self) -> &ReEncryptionWorkflow {
        &self.workflow
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // --- Bookmarks ---

    /// Save a page into the category for its domain.
    ///
    /// A protected category seals the bookmark with its cached key when
    /// unlocked; otherwise the password is requested and verified first.
    pub async fn add_bookmark(
        &self,
        url: &str,
        title: &str,
        credentials: &dyn CredentialProvider,
    ) -> Result<AddOutcome> {
        let parsed = url::Url::parse(url)
            .map_err(|e| VaultError::Validation(format!("Invalid URL {:?}: {}", url, e)))?;
        let domain = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| VaultError::Validation(format!("URL has no host: {}", url)))?
            .to_string();

        if self.is_bookmarked(url).await? {
            tracing::debug!(%domain, "already bookmarked");
            return Ok(AddOutcome::AlreadyBookmarked);
        }

        let category_id = self.category_for_domain(&domain).await?;
        let _guard = self.locks.guard(category_id).await;

        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;
        let secret = BookmarkSecret::new(url, title);

        let content = match &category.protection {
            None => BookmarkContent::Plain(secret.clone()),
            Some(protection) => {
                let cached = self
                    .locks
                    .with_key(category_id, |key| self.locks.cipher().seal(&secret, key));
                let sealed = match cached {
                    Some(sealed) => sealed?,
                    None => {
                        let password = require_password(
                            credentials,
                            PasswordPurpose::AddBookmark,
                            &category.name,
                        )
                        .await?;
                        protection.verifier.verify(&password)?;
                        let key =
                            derive_key_blocking(&password, &protection.salt, protection.kdf)
                                .await?;
                        self.locks.cipher().seal(&secret, &key)?
                    }
                };
                BookmarkContent::Sealed(sealed)
            }
        };

        let bookmark = Bookmark::new(category_id, domain, content);
        let bookmark_id = bookmark.id;
        let view = DecryptedBookmark::from_parts(&bookmark, secret);

        self.repo
            .update(move |c| {
                c.require_category(category_id)?;
                c.bookmarks.push(bookmark);
                Ok(())
            })
            .await?;
        self.locks.append_cached(category_id, view);

        tracing::info!(%category_id, %bookmark_id, "bookmark added");
        Ok(AddOutcome::Added {
            bookmark_id,
            category_id,
        })
    }

    /// Whether `url` is already saved, judged by every record that is
    /// readable right now.
    async fn is_bookmarked(&self, url: &str) -> Result<bool> {
        let collections = self.repo.load().await?;
        let plain = collections
            .bookmarks
            .iter()
            .filter_map(Bookmark::plain)
            .any(|secret| secret.url == url);
        if plain {
            return Ok(true);
        }

        Ok(collections
            .categories
            .iter()
            .filter(|c| c.is_protected())
            .filter_map(|c| self.locks.cached_records(c.id))
            .flatten()
            .any(|record| record.url == url))
    }

    /// Delete bookmarks by id after confirmation. Returns the number removed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotFound`] if any id is unknown
    /// - [`VaultError::Locked`] if a bookmark belongs to a protected category
    ///   that is not unlocked; nothing is deleted in that case
    /// - [`VaultError::Cancelled`] if the confirmation is declined
    pub async fn delete_bookmarks(
        &self,
        ids: &[Uuid],
        confirmation: &dyn Confirmation,
    ) -> Result<usize> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(0);
        }

        let owners: Vec<Uuid> = self
            .repo
            .load()
            .await?
            .bookmarks
            .iter()
            .filter(|b| wanted.contains(&b.id))
            .map(|b| b.category_id)
            .collect();
        let _guards = self.locks.guard_all(&owners).await;

        let collections = self.repo.load().await?;
        let missing = missing_bookmarks(&collections, &wanted);
        if !missing.is_empty() {
            return Err(VaultError::NotFound(format!("Bookmark(s) {}", missing)));
        }
        for category in collections
            .categories
            .iter()
            .filter(|c| owners.contains(&c.id))
        {
            if !matches!(
                self.locks.state(category),
                LockState::Unlocked | LockState::Unprotected
            ) {
                return Err(VaultError::Locked(category.name.clone()));
            }
        }

        let message = format!("Delete {} selected bookmark(s)?", wanted.len());
        if !confirmation.confirm(&message).await {
            return Err(VaultError::Cancelled);
        }

        let removed = {
            let wanted = wanted.clone();
            self.repo
                .update(move |c| {
                    let missing = missing_bookmarks(c, &wanted);
                    if !missing.is_empty() {
                        return Err(VaultError::NotFound(format!("Bookmark(s) {}", missing)));
                    }
                    let before = c.bookmarks.len();
                    c.bookmarks.retain(|b| !wanted.contains(&b.id));
                    Ok(before - c.bookmarks.len())
                })
                .await?
        };

        for category_id in owners {
            self.locks.forget_records(category_id, &wanted);
        }
        tracing::info!(count = removed, "bookmarks deleted");
        Ok(removed)
    }

    // --- Categories ---

    /// Category that bookmarks from `domain` go into, created if needed.
    ///
    /// The domain map is consulted first so a renamed category keeps
    /// receiving its domain.
    pub async fn category_for_domain(&self, domain: &str) -> Result<Uuid> {
        let domain = domain.to_string();
        let auto_create = self.settings.auto_create_categories;
        let default_name = self.settings.default_category_name.clone();

        self.repo
            .update(move |c| {
                if let Some(id) = c.domain_map.get(&domain).copied() {
                    if c.category(id).is_some() {
                        return Ok(id);
                    }
                    tracing::warn!(%domain, category_id = %id, "dropping stale domain mapping");
                    c.domain_map.remove(&domain);
                }

                if auto_create {
                    let category = Category::new(category_name_for_domain(&domain), Some(domain.clone()));
                    let id = category.id;
                    tracing::info!(category_id = %id, %domain, "category created");
                    c.categories.push(category);
                    c.domain_map.insert(domain, id);
                    return Ok(id);
                }

                if let Some(existing) = c.categories.iter().find(|cat| cat.name == default_name) {
                    return Ok(existing.id);
                }
                let category = Category::new(default_name, None);
                let id = category.id;
                tracing::info!(category_id = %id, "default category created");
                c.categories.push(category);
                Ok(id)
            })
            .await
    }

    /// Overview of every category.
    pub async fn categories(&self) -> Result<Vec<CategorySummary>> {
        let collections = self.repo.load().await?;
        Ok(collections
            .categories
            .iter()
            .map(|category| CategorySummary {
                id: category.id,
                name: category.name.clone(),
                original_domain: category.original_domain.clone(),
                created_at: category.created_at,
                bookmark_count: collections.bookmarks_in(category.id).count(),
                protected: category.is_protected(),
                state: self.locks.state(category),
            })
            .collect())
    }

    /// Readable bookmarks of a category.
    ///
    /// # Errors
    ///
    /// [`VaultError::Locked`] for a protected category that is not unlocked.
    pub async fn bookmarks(&self, category_id: Uuid) -> Result<Vec<DecryptedBookmark>> {
        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;
        if !category.is_protected() {
            return plaintext_records(collections.bookmarks_in(category_id));
        }
        self.locks
            .cached_records(category_id)
            .ok_or_else(|| VaultError::Locked(category.name.clone()))
    }

    /// Case-insensitive match on title or URL across readable categories.
    pub async fn search(&self, query: &str) -> Result<Vec<DecryptedBookmark>> {
        let needle = query.trim().to_lowercase();
        let collections = self.repo.load().await?;

        let mut hits = Vec::new();
        for category in &collections.categories {
            let visible = match self.locks.state(category) {
                LockState::Unprotected => plaintext_records(collections.bookmarks_in(category.id))?,
                LockState::Unlocked => self.locks.cached_records(category.id).unwrap_or_default(),
                LockState::Locked | LockState::Unlocking => continue,
            };
            hits.extend(visible.into_iter().filter(|record| {
                needle.is_empty()
                    || record.title.to_lowercase().contains(&needle)
                    || record.url.to_lowercase().contains(&needle)
            }));
        }
        Ok(hits)
    }

    pub async fn rename_category(&self, category_id: Uuid, name: &str) -> Result<()> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(VaultError::Validation(
                "Category name cannot be empty".to_string(),
            ));
        }

        self.repo
            .update(move |c| {
                let category = c
                    .category_mut(category_id)
                    .ok_or_else(|| VaultError::NotFound(format!("Category {}", category_id)))?;
                category.name = name;
                Ok(())
            })
            .await?;
        tracing::info!(%category_id, "category renamed");
        Ok(())
    }

    /// Delete a category with all of its bookmarks and domain mappings.
    ///
    /// A protected category's password is verified before asking for
    /// confirmation. Returns the number of bookmarks removed.
    pub async fn delete_category(
        &self,
        category_id: Uuid,
        credentials: &dyn CredentialProvider,
        confirmation: &dyn Confirmation,
    ) -> Result<usize> {
        let _guard = self.locks.guard(category_id).await;

        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;
        if let Some(protection) = &category.protection {
            let password =
                require_password(credentials, PasswordPurpose::DeleteCategory, &category.name)
                    .await?;
            protection.verifier.verify(&password)?;
        }

        let count = collections.bookmarks_in(category_id).count();
        let message = format!("Delete \"{}\" and its {} bookmark(s)?", category.name, count);
        if !confirmation.confirm(&message).await {
            return Err(VaultError::Cancelled);
        }

        let removed = self
            .repo
            .update(move |c| {
                c.require_category(category_id)?;
                c.categories.retain(|cat| cat.id != category_id);
                let before = c.bookmarks.len();
                c.bookmarks.retain(|b| b.category_id != category_id);
                c.domain_map.retain(|_, id| *id != category_id);
                Ok(before - c.bookmarks.len())
            })
            .await?;

        self.locks.invalidate(category_id);
        tracing::info!(%category_id, bookmarks = removed, "category deleted");
        Ok(removed)
    }

    /// Resolve a category by full id, unique id prefix, or name (case-insensitive).
    pub async fn find_category(&self, selector: &str) -> Result<Category> {
        let collections = self.repo.load().await?;
        resolve_category(&collections, selector).cloned()
    }

    // --- Locking and passwords ---

    /// Prompt for the password and unlock.
    pub async fn unlock_with(
        &self,
        category_id: Uuid,
        credentials: &dyn CredentialProvider,
    ) -> Result<Vec<DecryptedBookmark>> {
        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;
        if !category.is_protected() {
            return plaintext_records(collections.bookmarks_in(category_id));
        }
        if let Some(records) = self.locks.cached_records(category_id) {
            return Ok(records);
        }

        let password = require_password(credentials, PasswordPurpose::Unlock, &category.name).await?;
        self.locks.unlock(category_id, &password).await
    }

    pub async fn unlock(
        &self,
        category_id: Uuid,
        password: &SecretString,
    ) -> Result<Vec<DecryptedBookmark>> {
        self.locks.unlock(category_id, password).await
    }

    pub async fn lock(&self, category_id: Uuid) {
        self.locks.lock(category_id).await
    }

    pub async fn lock_all(&self) {
        self.locks.lock_all().await
    }

    /// Interactive password management for one category.
    ///
    /// Unprotected: ask for a new password and protect. Protected: ask for
    /// the current password, then confirm whether to change it (yes) or
    /// remove it (no).
    pub async fn manage_password(
        &self,
        category_id: Uuid,
        credentials: &dyn CredentialProvider,
        confirmation: &dyn Confirmation,
    ) -> Result<PasswordChange> {
        let collections = self.repo.load().await?;
        let category = collections.require_category(category_id)?;

        let Some(protection) = &category.protection else {
            let new_password =
                require_password(credentials, PasswordPurpose::New, &category.name).await?;
            let advice = self.workflow.set_password(category_id, &new_password).await?;
            return Ok(PasswordChange::Set(advice));
        };

        let current = require_password(credentials, PasswordPurpose::Current, &category.name).await?;
        protection.verifier.verify(&current)?;

        let change = confirmation
            .confirm(&format!(
                "Change the password for \"{}\"? Answer no to remove it instead.",
                category.name
            ))
            .await;

        if change {
            let new_password =
                require_password(credentials, PasswordPurpose::New, &category.name).await?;
            let advice = self
                .workflow
                .change_password(category_id, &current, &new_password)
                .await?;
            Ok(PasswordChange::Changed(advice))
        } else {
            self.workflow.remove_password(category_id, &current).await?;
            Ok(PasswordChange::Removed)
        }
    }

    pub async fn set_password(
        &self,
        category_id: Uuid,
        new_password: &SecretString,
    ) -> Result<PasswordAdvice> {
        self.workflow.set_password(category_id, new_password).await
    }

    pub async fn change_password(
        &self,
        category_id: Uuid,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<PasswordAdvice> {
        self.workflow
            .change_password(category_id, old_password, new_password)
            .await
    }

    pub async fn remove_password(&self, category_id: Uuid, password: &SecretString) -> Result<()> {
        self.workflow.remove_password(category_id, password).await
    }

    // --- Maintenance ---

    pub async fn check_integrity(&self) -> Result<IntegrityReport> {
        let collections = self.repo.load().await?;
        Ok(check_collections(&collections))
    }
}

/// `www.github.com` → `Github`.
pub fn category_name_for_domain(domain: &str) -> String {
    let bare = domain.strip_prefix("www.").unwrap_or(domain);
    let label = bare.split('.').next().unwrap_or(bare);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Comma-separated ids from `wanted` that no stored bookmark has.
fn missing_bookmarks(collections: &Collections, wanted: &HashSet<Uuid>) -> String {
    let mut missing: Vec<String> = wanted
        .iter()
        .filter(|id| !collections.bookmarks.iter().any(|b| b.id == **id))
        .map(Uuid::to_string)
        .collect();
    missing.sort();
    missing.join(", ")
}

fn resolve_category<'a>(collections: &'a Collections, selector: &str) -> Result<&'a Category> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(VaultError::Validation(
            "Category selector cannot be empty".to_string(),
        ));
    }

    if let Ok(id) = Uuid::parse_str(selector) {
        if let Some(category) = collections.category(id) {
            return Ok(category);
        }
    }

    let lowered = selector.to_lowercase();
    let by_prefix: Vec<&Category> = collections
        .categories
        .iter()
        .filter(|c| c.id.to_string().starts_with(&lowered))
        .collect();
    if by_prefix.len() == 1 {
        return Ok(by_prefix[0]);
    }

    let by_name: Vec<&Category> = collections
        .categories
        .iter()
        .filter(|c| c.name.to_lowercase() == lowered)
        .collect();
    match by_name.len() {
        1 => Ok(by_name[0]),
        0 if by_prefix.len() > 1 => Err(VaultError::Validation(format!(
            "Ambiguous category id prefix: {}",
            selector
        ))),
        0 => Err(VaultError::NotFound(format!("Category {}", selector))),
        _ => Err(VaultError::Validation(format!(
            "Several categories are named {:?}; use the id",
            selector
        ))),
    }
}
