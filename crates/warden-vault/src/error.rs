//! Error types for the vault module.

use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The backend could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A raw key was offered to a backend that cannot protect it.
    #[error("platform-secured storage is not available")]
    PlatformStorageUnavailable,

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::StorageUnavailable(e.to_string())
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
