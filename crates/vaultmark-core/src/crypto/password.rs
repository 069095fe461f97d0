//! Category password validation.
//!
//! An empty password is rejected outright. Short passwords are accepted
//! but come back with advice the caller can surface as a warning.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, VaultError};

/// Recommended minimum password length in characters.
pub const RECOMMENDED_PASSWORD_LENGTH: usize = 12;

/// Non-fatal feedback about an accepted password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordAdvice {
    Ok,
    /// Shorter than [`RECOMMENDED_PASSWORD_LENGTH`]; carries the actual length.
    TooShort(usize),
}

impl PasswordAdvice {
    pub fn warning(&self) -> Option<String> {
        match self {
            PasswordAdvice::Ok => None,
            PasswordAdvice::TooShort(len) => Some(format!(
                "Password is {} characters; at least {} is recommended",
                len, RECOMMENDED_PASSWORD_LENGTH
            )),
        }
    }
}

/// Validate a new category password.
///
/// # Examples
///
/// ```
/// use secrecy::SecretString;
/// use vaultmark_core::crypto::{validate_password, PasswordAdvice};
///
/// let strong = SecretString::from("correct-horse-battery".to_string());
/// assert_eq!(validate_password(&strong).unwrap(), PasswordAdvice::Ok);
///
/// let blank = SecretString::from("   ".to_string());
/// assert!(validate_password(&blank).is_err());
/// ```
pub fn validate_password(password: &SecretString) -> Result<PasswordAdvice> {
    let value = password.expose_secret();
    if value.trim().is_empty() {
        return Err(VaultError::Validation(
            "Password cannot be empty".to_string(),
        ));
    }

    let len = value.chars().count();
    if len < RECOMMENDED_PASSWORD_LENGTH {
        tracing::warn!(length = len, "password shorter than recommended");
        return Ok(PasswordAdvice::TooShort(len));
    }

    Ok(PasswordAdvice::Ok)
}
