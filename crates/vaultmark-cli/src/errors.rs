//! CLI error types for structured error handling.
//!
//! Core errors are mapped onto a small set of CLI errors, each with its own
//! exit code and an optional hint line.

use std::fmt;

use vaultmark_core::VaultError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (config, store, category, bookmark)
    NotFound { message: String, hint: String },

    /// Wrong category password
    AuthFailed {
        message: String,
        hint: Option<String>,
    },

    /// Invalid user input
    InvalidInput(String),

    /// Ciphertext failed to authenticate, or the store is inconsistent
    Integrity { message: String, hint: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } | CliError::Integrity { message, hint } => {
                write!(f, "{}\n{}", message, hint)
            }
            CliError::AuthFailed { message, hint } => {
                if let Some(h) = hint {
                    write!(f, "{}\n{}", message, h)
                } else {
                    write!(f, "{}", message)
                }
            }
            CliError::InvalidInput(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn auth_failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::AuthFailed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn integrity(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::Integrity {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Map a core error to its CLI counterpart.
    ///
    /// Returns `None` for errors that should surface as general failures.
    pub fn from_vault(err: &VaultError) -> Option<Self> {
        match err {
            VaultError::NotFound(what) => Some(Self::not_found(
                format!("Not found: {}", what),
                "Run `vaultmark list` to see categories.",
            )),
            VaultError::Authentication => Some(Self::auth_failed_with_hint(
                "Incorrect password",
                "Nothing was changed.",
            )),
            VaultError::Validation(message) => Some(Self::invalid_input(message.clone())),
            VaultError::InvalidState(message) | VaultError::Locked(message) => {
                Some(Self::invalid_input(message.clone()))
            }
            VaultError::Decryption(message) => Some(Self::integrity(
                format!("Stored data could not be decrypted: {}", message),
                "The password was correct, so the data may be corrupted. Run `vaultmark check`.",
            )),
            _ => None,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::Integrity { .. } => exit_codes::INTEGRITY_FAILED,
        }
    }
}

/// Split an error into its message and hint lines.
pub fn message_and_hint(err: &anyhow::Error) -> (String, Option<String>) {
    let text = match err.downcast_ref::<CliError>() {
        Some(cli) => cli.to_string(),
        None => match err.downcast_ref::<VaultError>().and_then(CliError::from_vault) {
            Some(cli) => cli.to_string(),
            None => format!("{:#}", err),
        },
    };
    match text.split_once('\n') {
        Some((message, hint)) => (message.to_string(), Some(hint.to_string())),
        None => (text, None),
    }
}

/// Exit code for an error returned from a command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    err.downcast_ref::<VaultError>()
        .and_then(CliError::from_vault)
        .map(|cli| cli.exit_code())
        .unwrap_or(1)
}

/// Whether the error is a dismissed prompt.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<VaultError>()
        .is_some_and(VaultError::is_cancelled)
}
