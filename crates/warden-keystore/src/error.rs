//! Error types for the keystore module.

use thiserror::Error;

/// Errors that can occur while encrypting or decrypting a keystore.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeystoreError {
    /// MAC mismatch. Deliberately carries no detail.
    #[error("wrong password")]
    WrongPassword,

    /// The document is structurally invalid or names an unsupported algorithm.
    #[error("corrupt keystore: {0}")]
    CorruptKeystore(String),

    /// The document version is not one this codec reads.
    #[error("unsupported keystore version: {0}")]
    UnsupportedVersion(u32),

    /// The decrypted secret is not a valid private key.
    #[error("invalid private key")]
    InvalidKey,

    /// Configured KDF parameters are out of the accepted range.
    #[error("invalid kdf config: {0}")]
    InvalidKdfConfig(String),

    /// The blocking KDF task failed to complete.
    #[error("key derivation task failed: {0}")]
    Task(String),
}

impl KeystoreError {
    /// Whether this error means the document itself is unusable, as opposed
    /// to the password being wrong.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            KeystoreError::CorruptKeystore(_) | KeystoreError::UnsupportedVersion(_)
        )
    }
}

impl From<warden_core::CoreError> for KeystoreError {
    fn from(_: warden_core::CoreError) -> Self {
        KeystoreError::InvalidKey
    }
}

/// Result type for keystore operations.
pub type Result<T> = std::result::Result<T, KeystoreError>;
