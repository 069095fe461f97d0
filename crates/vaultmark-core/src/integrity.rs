//! Consistency checks over the persisted collections.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::storage::Collections;

/// One inconsistency found by [`check_collections`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Bookmarks whose variant disagrees with their category's protection
    MixedCategory {
        category_id: Uuid,
        name: String,
        protected: bool,
        mismatched: usize,
    },
    /// Bookmark pointing at a category that does not exist
    OrphanBookmark { bookmark_id: Uuid, category_id: Uuid },
    /// Domain mapped to a category that does not exist
    StaleDomainMapping { domain: String, category_id: Uuid },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::MixedCategory {
                name,
                protected,
                mismatched,
                ..
            } => {
                let found = if *protected { "plaintext" } else { "encrypted" };
                write!(
                    f,
                    "category \"{}\" has {} {} bookmark(s)",
                    name, mismatched, found
                )
            }
            IntegrityIssue::OrphanBookmark {
                bookmark_id,
                category_id,
            } => write!(
                f,
                "bookmark {} belongs to missing category {}",
                bookmark_id, category_id
            ),
            IntegrityIssue::StaleDomainMapping {
                domain,
                category_id,
            } => write!(
                f,
                "domain {} maps to missing category {}",
                domain, category_id
            ),
        }
    }
}

/// Findings of an integrity check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub categories: usize,
    pub bookmarks: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn check_collections(collections: &Collections) -> IntegrityReport {
    let mut issues = Vec::new();

    for category in &collections.categories {
        let protected = category.is_protected();
        let mismatched = collections
            .bookmarks_in(category.id)
            .filter(|b| b.is_sealed() != protected)
            .count();
        if mismatched > 0 {
            issues.push(IntegrityIssue::MixedCategory {
                category_id: category.id,
                name: category.name.clone(),
                protected,
                mismatched,
            });
        }
    }

    for bookmark in &collections.bookmarks {
        if collections.category(bookmark.category_id).is_none() {
            issues.push(IntegrityIssue::OrphanBookmark {
                bookmark_id: bookmark.id,
                category_id: bookmark.category_id,
            });
        }
    }

    for (domain, category_id) in &collections.domain_map {
        if collections.category(*category_id).is_none() {
            issues.push(IntegrityIssue::StaleDomainMapping {
                domain: domain.clone(),
                category_id: *category_id,
            });
        }
    }

    if !issues.is_empty() {
        tracing::warn!(issues = issues.len(), "integrity check found problems");
    }

    IntegrityReport {
        categories: collections.categories.len(),
        bookmarks: collections.bookmarks.len(),
        issues,
    }
}
