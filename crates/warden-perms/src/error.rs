//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur while building, signing or applying permissions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermsError {
    /// The signer declined to sign.
    #[error("user rejected the signature request")]
    UserRejectedSignature,

    /// No signer is attached, or the attached wallet is not listening.
    #[error("no signer available")]
    SigningUnavailable,

    /// The permission transaction reverted.
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),

    /// The user declined to send the permission transaction.
    #[error("transaction rejected by user")]
    TransactionRejectedByUser,

    /// The chain could not be reached.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    /// The requested permissions are malformed.
    #[error("invalid permission request: {0}")]
    InvalidRequest(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] warden_core::CoreError),
}

impl PermsError {
    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PermsError::ChainUnavailable(_) | PermsError::TransactionReverted(_)
        )
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
