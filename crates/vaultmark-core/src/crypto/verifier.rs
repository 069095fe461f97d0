//! Password verifier.
//!
//! The verifier is the only trace of a category password that is persisted.
//! It is a plain SHA-256 digest of the password bytes, checked before any
//! expensive key derivation happens.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{Result, VaultError};

/// Length of the verifier digest in bytes.
pub const VERIFIER_LENGTH: usize = 32;

/// Stored digest used to check a supplied password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordVerifier([u8; VERIFIER_LENGTH]);

impl PasswordVerifier {
    /// Compute the verifier for a password.
    pub fn compute(password: &SecretString) -> Self {
        let digest = Sha256::digest(password.expose_secret().as_bytes());
        let mut bytes = [0u8; VERIFIER_LENGTH];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Recompute the digest for `password` and compare in constant time.
    pub fn matches(&self, password: &SecretString) -> bool {
        let candidate = Self::compute(password);
        self.0.ct_eq(&candidate.0).into()
    }

    /// Fail with [`VaultError::Authentication`] unless `password` matches.
    pub fn verify(&self, password: &SecretString) -> Result<()> {
        if self.matches(password) {
            Ok(())
        } else {
            Err(VaultError::Authentication)
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; VERIFIER_LENGTH] = bytes.try_into().map_err(|_| {
            VaultError::Storage(format!(
                "Password verifier must be {} bytes (got {})",
                VERIFIER_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; VERIFIER_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordVerifier")
            .field(&hex::encode(&self.0[..4]))
            .finish()
    }
}
