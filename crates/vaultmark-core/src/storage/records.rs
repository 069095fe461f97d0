//! Persisted record shapes.
//!
//! This is the only place binary fields are hex encoded. Decoding is strict:
//! a category with a verifier but no salt (or the reverse), or a bookmark
//! whose `encrypted` flag disagrees with its populated fields, is rejected
//! as a storage error rather than repaired.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{KdfParams, PasswordVerifier, SealedRecord, IV_LENGTH};
use crate::error::{Result, VaultError};
use crate::model::{Bookmark, BookmarkContent, BookmarkSecret, Category, Protection};

/// Category as stored under the `categories` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_domain: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<KdfParams>,
}

/// Bookmark as stored under the `bookmarks` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookmarkRecord {
    pub id: Uuid,
    pub category_id: Uuid,
    pub domain: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
}

impl From<&Category> for CategoryRecord {
    fn from(category: &Category) -> Self {
        let protection = category.protection.as_ref();
        Self {
            id: category.id,
            name: category.name.clone(),
            original_domain: category.original_domain.clone(),
            created_at: category.created_at,
            password_verifier: protection.map(|p| hex::encode(p.verifier.as_bytes())),
            salt: protection.map(|p| hex::encode(&p.salt)),
            kdf: protection.map(|p| p.kdf),
        }
    }
}

impl TryFrom<CategoryRecord> for Category {
    type Error = VaultError;

    fn try_from(record: CategoryRecord) -> Result<Self> {
        let protection = match (record.password_verifier, record.salt) {
            (None, None) => {
                if record.kdf.is_some() {
                    return Err(VaultError::Storage(format!(
                        "Category {} has KDF parameters but no password",
                        record.id
                    )));
                }
                None
            }
            (Some(verifier), Some(salt)) => {
                let kdf = record.kdf.ok_or_else(|| {
                    VaultError::Storage(format!(
                        "Category {} is protected but has no KDF parameters",
                        record.id
                    ))
                })?;
                let salt = hex::decode(salt)?;
                if salt.is_empty() {
                    return Err(VaultError::Storage(format!(
                        "Category {} has an empty salt",
                        record.id
                    )));
                }
                Some(Protection {
                    verifier: PasswordVerifier::from_bytes(&hex::decode(verifier)?)?,
                    salt,
                    kdf,
                })
            }
            _ => {
                return Err(VaultError::Storage(format!(
                    "Category {} must have both a password verifier and a salt, or neither",
                    record.id
                )))
            }
        };

        Ok(Category {
            id: record.id,
            name: record.name,
            original_domain: record.original_domain,
            created_at: record.created_at,
            protection,
        })
    }
}

impl From<&Bookmark> for BookmarkRecord {
    fn from(bookmark: &Bookmark) -> Self {
        let mut record = Self {
            id: bookmark.id,
            category_id: bookmark.category_id,
            domain: bookmark.domain.clone(),
            created_at: bookmark.created_at,
            encrypted: bookmark.is_sealed(),
            url: None,
            title: None,
            ciphertext: None,
            iv: None,
        };
        match &bookmark.content {
            BookmarkContent::Plain(secret) => {
                record.url = Some(secret.url.clone());
                record.title = Some(secret.title.clone());
            }
            BookmarkContent::Sealed(sealed) => {
                record.ciphertext = Some(hex::encode(&sealed.ciphertext));
                record.iv = Some(hex::encode(sealed.iv));
            }
        }
        record
    }
}

impl TryFrom<BookmarkRecord> for Bookmark {
    type Error = VaultError;

    fn try_from(record: BookmarkRecord) -> Result<Self> {
        let mismatch = || {
            VaultError::Storage(format!(
                "Bookmark {} fields disagree with encrypted={}",
                record.id, record.encrypted
            ))
        };

        let content = match (
            record.encrypted,
            &record.url,
            &record.title,
            &record.ciphertext,
            &record.iv,
        ) {
            (false, Some(url), Some(title), None, None) => {
                BookmarkContent::Plain(BookmarkSecret::new(url.clone(), title.clone()))
            }
            (true, None, None, Some(ciphertext), Some(iv)) => {
                let iv: [u8; IV_LENGTH] = hex::decode(iv)?.try_into().map_err(|_| {
                    VaultError::Storage(format!(
                        "Bookmark {} nonce must be {} bytes",
                        record.id, IV_LENGTH
                    ))
                })?;
                BookmarkContent::Sealed(SealedRecord {
                    ciphertext: hex::decode(ciphertext)?,
                    iv,
                })
            }
            _ => return Err(mismatch()),
        };

        Ok(Bookmark {
            id: record.id,
            category_id: record.category_id,
            domain: record.domain,
            created_at: record.created_at,
            content,
        })
    }
}

pub fn decode_categories(value: Option<serde_json::Value>) -> Result<Vec<Category>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let records: Vec<CategoryRecord> = serde_json::from_value(value)?;
    records.into_iter().map(Category::try_from).collect()
}

pub fn encode_categories(categories: &[Category]) -> Result<serde_json::Value> {
    let records: Vec<CategoryRecord> = categories.iter().map(CategoryRecord::from).collect();
    Ok(serde_json::to_value(records)?)
}

pub fn decode_bookmarks(value: Option<serde_json::Value>) -> Result<Vec<Bookmark>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let records: Vec<BookmarkRecord> = serde_json::from_value(value)?;
    records.into_iter().map(Bookmark::try_from).collect()
}

pub fn encode_bookmarks(bookmarks: &[Bookmark]) -> Result<serde_json::Value> {
    let records: Vec<BookmarkRecord> = bookmarks.iter().map(BookmarkRecord::from).collect();
    Ok(serde_json::to_value(records)?)
}

pub fn decode_domain_map(value: Option<serde_json::Value>) -> Result<BTreeMap<String, Uuid>> {
    match value {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(BTreeMap::new()),
    }
}

pub fn encode_domain_map(map: &BTreeMap<String, Uuid>) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(map)?)
}
