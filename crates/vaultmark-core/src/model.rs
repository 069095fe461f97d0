//! In-memory data model.
//!
//! Binary fields (salt, verifier, ciphertext, nonce) stay as raw bytes here;
//! hex encoding only happens in [`crate::storage::records`].

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{KdfParams, PasswordVerifier, SealedRecord};

/// Current time at the millisecond precision records are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// The sensitive fields of a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkSecret {
    pub url: String,
    pub title: String,
}

impl BookmarkSecret {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Password protection attached to a category.
///
/// Verifier and salt only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protection {
    pub verifier: PasswordVerifier,

    /// Key-derivation salt; never used for the verifier
    pub salt: Vec<u8>,

    /// Work factor the category key is derived with
    pub kdf: KdfParams,
}

/// A named group of bookmarks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,

    /// Display name; has no effect on protection
    pub name: String,

    /// Domain the category was auto-created for, if any
    pub original_domain: Option<String>,

    pub created_at: DateTime<Utc>,

    /// `None` for an unprotected category
    pub protection: Option<Protection>,
}

impl Category {
    pub fn new(name: impl Into<String>, original_domain: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            original_domain,
            created_at: now(),
            protection: None,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.protection.is_some()
    }
}

/// Sensitive part of a bookmark at rest: plaintext or sealed, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkContent {
    Plain(BookmarkSecret),
    Sealed(SealedRecord),
}

/// A saved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub id: Uuid,
    pub category_id: Uuid,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub content: BookmarkContent,
}

impl Bookmark {
    pub fn new(category_id: Uuid, domain: impl Into<String>, content: BookmarkContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            domain: domain.into(),
            created_at: now(),
            content,
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.content, BookmarkContent::Sealed(_))
    }

    pub fn plain(&self) -> Option<&BookmarkSecret> {
        match &self.content {
            BookmarkContent::Plain(secret) => Some(secret),
            BookmarkContent::Sealed(_) => None,
        }
    }

    /// Same metadata, different content.
    pub(crate) fn with_content(&self, content: BookmarkContent) -> Self {
        Self {
            content,
            ..self.clone()
        }
    }
}

/// A bookmark with its plaintext fields, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptedBookmark {
    pub id: Uuid,
    pub category_id: Uuid,
    pub domain: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub title: String,
}

impl DecryptedBookmark {
    pub fn from_parts(bookmark: &Bookmark, secret: BookmarkSecret) -> Self {
        Self {
            id: bookmark.id,
            category_id: bookmark.category_id,
            domain: bookmark.domain.clone(),
            created_at: bookmark.created_at,
            url: secret.url,
            title: secret.title,
        }
    }

    pub fn secret(&self) -> BookmarkSecret {
        BookmarkSecret::new(self.url.clone(), self.title.clone())
    }
}

/// Runtime lock state of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// No password; contents always readable
    Unprotected,
    Locked,
    /// Password verification in flight
    Unlocking,
    Unlocked,
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LockState::Unprotected => "unprotected",
            LockState::Locked => "locked",
            LockState::Unlocking => "unlocking",
            LockState::Unlocked => "unlocked",
        };
        f.write_str(label)
    }
}

/// Overview row for one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub original_domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub bookmark_count: usize,
    pub protected: bool,
    pub state: LockState,
}
