//! Cryptographic operations for protected categories.
//!
//! This module provides key derivation, password verification and record
//! sealing using well-audited libraries:
//! - **Argon2id**: Memory-hard key derivation function
//! - **AES-256-GCM**: Authenticated encryption of individual bookmarks
//! - **SHA-256**: Password verifier digest
//!
//! ## Security Model
//!
//! - Each protected category has its own random salt and work factor
//! - Every sealed record carries a fresh random 96-bit nonce
//! - Derived keys are zeroized from memory on drop
//! - No plaintext passwords are stored
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the persisted bookmark collections
//! - Tampering with stored ciphertext (detected by the GCM tag)
//!
//! We do NOT defend against:
//! - Compromised process / keylogger
//! - Access to an unlocked category in memory

pub mod cipher;
pub mod kdf;
pub mod password;
pub mod verifier;

pub use cipher::{AeadCipher, RecordCipher, SealedRecord, IV_LENGTH};
pub use kdf::{derive_key, derive_key_blocking, generate_salt, DerivedKey, KdfParams, SALT_LENGTH};
pub use password::{validate_password, PasswordAdvice};
pub use verifier::PasswordVerifier;
