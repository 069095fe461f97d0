//! # Vaultmark Core
//!
//! Core library for Vaultmark - bookmarks grouped into categories, where any
//! category can be protected by a password and its bookmarks stored as
//! authenticated ciphertext.
//!
//! This crate provides the domain logic, storage abstractions, and data models
//! independent of the CLI interface.
//!
//! ## Architecture
//!
//! - **crypto**: Argon2id key derivation, password verifier, AES-GCM record sealing
//! - **lock**: Runtime lock state and the key/plaintext caches
//! - **workflow**: Set / change / remove password with all-or-nothing commits
//! - **storage**: Key/value store contract, backends, and the commit path
//! - **library**: Everyday bookmark and category operations
//! - **credentials**: Injected password and confirmation prompts

pub mod credentials;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod integrity;
pub mod library;
pub mod lock;
pub mod model;
pub mod storage;
pub mod workflow;

pub use credentials::{Confirmation, CredentialProvider, PasswordPurpose};
pub use crypto::{KdfParams, PasswordAdvice};
pub use error::{Result, VaultError};
pub use integrity::{IntegrityIssue, IntegrityReport};
pub use library::{AddOutcome, Library, LibrarySettings, PasswordChange};
pub use lock::CategoryLockController;
pub use model::{Bookmark, Category, CategorySummary, DecryptedBookmark, LockState};
pub use storage::{JsonDirStore, MemoryStore, PersistentStore, SqliteStore};
pub use workflow::ReEncryptionWorkflow;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
