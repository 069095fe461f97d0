//! Interactive collaborators injected into the library.
//!
//! The core never prompts on its own. A front end supplies a
//! [`CredentialProvider`] for passwords and a [`Confirmation`] for yes/no
//! questions; returning `None` from a password prompt cancels the operation
//! before any key derivation runs.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{Result, VaultError};

/// Why a password is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPurpose {
    /// View a protected category
    Unlock,
    /// Seal a new bookmark into a locked category
    AddBookmark,
    /// Prove knowledge of the current password before a change
    Current,
    /// Choose a new password
    New,
    /// Authorize deleting a protected category
    DeleteCategory,
}

impl PasswordPurpose {
    /// Prompt text for a category.
    pub fn prompt(&self, category: &str) -> String {
        match self {
            PasswordPurpose::Unlock => format!("Password to view \"{}\"", category),
            PasswordPurpose::AddBookmark => {
                format!("\"{}\" is password-protected. Password to save bookmark", category)
            }
            PasswordPurpose::Current => format!("Current password for \"{}\"", category),
            PasswordPurpose::New => format!(
                "New password for \"{}\" (12+ characters recommended)",
                category
            ),
            PasswordPurpose::DeleteCategory => {
                format!("Password to delete \"{}\"", category)
            }
        }
    }
}

/// Source of passwords.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Ask for a password. `Ok(None)` means the user cancelled.
    async fn request_password(
        &self,
        purpose: PasswordPurpose,
        category: &str,
    ) -> Result<Option<SecretString>>;
}

/// Source of yes/no answers.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Request a password, turning a cancelled prompt into [`VaultError::Cancelled`].
pub async fn require_password(
    provider: &dyn CredentialProvider,
    purpose: PasswordPurpose,
    category: &str,
) -> Result<SecretString> {
    match provider.request_password(purpose, category).await? {
        Some(password) => Ok(password),
        None => {
            tracing::debug!(?purpose, "password prompt cancelled");
            Err(VaultError::Cancelled)
        }
    }
}
