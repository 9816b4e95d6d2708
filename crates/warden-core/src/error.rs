//! Error types for Warden Core.

use thiserror::Error;

/// Core errors that can occur while handling key material and signatures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Private key bytes are not a valid secp256k1 scalar.
    #[error("invalid private key")]
    InvalidKey,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Signature bytes are malformed or do not recover to a public key.
    #[error("invalid signature")]
    InvalidSignature,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
