//! Error types for Vaultmark core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps them to
//! user-facing messages and exit codes.

use thiserror::Error;

/// Result type alias for Vaultmark operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Core error type for Vaultmark operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Rejected user input (empty password, blank name, malformed URL)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Supplied password does not match the stored verifier
    #[error("Incorrect password")]
    Authentication,

    /// An authentication tag failed to verify while opening a record.
    ///
    /// The verifier matched, so this points at corrupted or tampered data
    /// rather than a wrong password.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The user dismissed a prompt; nothing was changed
    #[error("Cancelled")]
    Cancelled,

    /// Plaintext was requested for a protected category that is not unlocked
    #[error("Category is locked: {0}")]
    Locked(String),

    /// Operation precondition does not hold (e.g. protecting a protected category)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Key derivation or sealing error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Storage backend error or malformed persisted record
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error (fallback)
    #[error("{0}")]
    Other(String),
}

impl VaultError {
    /// Whether this error is a user cancellation rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VaultError::Cancelled)
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Storage(format!("JSON error: {}", err))
    }
}

impl From<hex::FromHexError> for VaultError {
    fn from(err: hex::FromHexError) -> Self {
        VaultError::Storage(format!("Invalid hex field: {}", err))
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        VaultError::Storage(format!("SQLite error: {}", err))
    }
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        VaultError::Other(format!("Background task failed: {}", err))
    }
}
