//! Per-record authenticated encryption.
//!
//! A bookmark's sensitive fields are serialized as a small JSON object and
//! sealed with AES-256-GCM under the category key. Each seal draws its own
//! random 96-bit nonce; the 16-byte tag is appended to the ciphertext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::kdf::DerivedKey;
use crate::error::{Result, VaultError};
use crate::model::BookmarkSecret;

/// Nonce length for AES-GCM.
pub const IV_LENGTH: usize = 12;

/// Ciphertext plus the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedRecord {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LENGTH],
}

/// Seals and opens individual bookmark records.
///
/// Implementations are stateless. `open` must either return the complete
/// record or fail; it never yields partial plaintext.
pub trait RecordCipher: Send + Sync {
    fn seal(&self, record: &BookmarkSecret, key: &DerivedKey) -> Result<SealedRecord>;

    fn open(&self, sealed: &SealedRecord, key: &DerivedKey) -> Result<BookmarkSecret>;
}

/// AES-256-GCM implementation of [`RecordCipher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AeadCipher;

impl AeadCipher {
    fn cipher(key: &DerivedKey) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::Crypto(format!("Invalid key length: {}", e)))
    }
}

impl RecordCipher for AeadCipher {
    fn seal(&self, record: &BookmarkSecret, key: &DerivedKey) -> Result<SealedRecord> {
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);

        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Self::cipher(key)?
            .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
            .map_err(|_| VaultError::Crypto("Encryption failed".to_string()))?;

        Ok(SealedRecord { ciphertext, iv })
    }

    fn open(&self, sealed: &SealedRecord, key: &DerivedKey) -> Result<BookmarkSecret> {
        let plaintext = Self::cipher(key)?
            .decrypt(Nonce::from_slice(&sealed.iv), sealed.ciphertext.as_slice())
            .map_err(|_| VaultError::Decryption("authentication tag mismatch".to_string()))?;
        let plaintext = Zeroizing::new(plaintext);

        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::Decryption(format!("malformed record payload: {}", e)))
    }
}
