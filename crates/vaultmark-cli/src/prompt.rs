//! Terminal implementations of the core's prompt traits.
//!
//! Passwords come from the environment first, then from a hidden terminal
//! prompt. An empty answer at the prompt cancels the operation.

use async_trait::async_trait;
use dialoguer::{Confirm, Password};
use secrecy::SecretString;
use vaultmark_core::{Confirmation, CredentialProvider, PasswordPurpose, Result, VaultError};

use crate::constants::env_vars;
use crate::ui::UiContext;

/// Interactive attempts allowed when a password is typed at the prompt.
pub const MAX_ATTEMPTS: usize = 3;

pub struct TerminalPrompts {
    assume_yes: bool,
    interactive: bool,
}

impl TerminalPrompts {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            interactive: UiContext::is_interactive(),
        }
    }

    /// Whether a wrong password may be retried: only when a person is typing it.
    pub fn can_retry(&self, purpose: PasswordPurpose) -> bool {
        self.interactive && password_from_env(purpose).is_none()
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }
}

fn env_var_for(purpose: PasswordPurpose) -> &'static str {
    match purpose {
        PasswordPurpose::New => env_vars::NEW_PASSWORD,
        _ => env_vars::PASSWORD,
    }
}

fn password_from_env(purpose: PasswordPurpose) -> Option<SecretString> {
    std::env::var(env_var_for(purpose))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

#[async_trait]
impl CredentialProvider for TerminalPrompts {
    async fn request_password(
        &self,
        purpose: PasswordPurpose,
        category: &str,
    ) -> Result<Option<SecretString>> {
        if let Some(password) = password_from_env(purpose) {
            tracing::debug!(?purpose, "password taken from environment");
            return Ok(Some(password));
        }
        if !self.interactive {
            return Err(VaultError::Validation(format!(
                "No password provided and no TTY available. Set {}.",
                env_var_for(purpose)
            )));
        }

        let prompt = purpose.prompt(category);
        let answer = tokio::task::spawn_blocking(move || {
            let mut input = Password::new()
                .with_prompt(format!("{} (empty to cancel)", prompt))
                .allow_empty_password(true);
            if purpose == PasswordPurpose::New {
                input = input.with_confirmation("Repeat password", "Passwords do not match");
            }
            input.interact()
        })
        .await?
        .map_err(|e| VaultError::Other(format!("Failed to read password: {}", e)))?;

        if answer.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(answer)))
    }
}

#[async_trait]
impl Confirmation for TerminalPrompts {
    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        if !self.interactive {
            tracing::debug!("no TTY for confirmation; treating as no");
            return false;
        }
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(message)
                .default(false)
                .interact()
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }
}
