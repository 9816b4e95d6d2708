//! Error types for Warden.

use thiserror::Error;
use warden_core::{Address, CoreError};
use warden_keystore::KeystoreError;
use warden_perms::PermsError;
use warden_vault::VaultError;

use crate::state::CoordinatorState;

/// Errors that can occur during coordinator operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Key error.
    #[error("key error: {0}")]
    Core(#[from] CoreError),

    /// Keystore error, including a wrong password.
    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    /// Vault error.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Permission error.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),

    /// The operation is not valid in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: CoordinatorState,
    },

    /// A password is needed to encrypt or decrypt the credential.
    #[error("password required")]
    PasswordRequired,

    /// A different credential is already saved; the caller must confirm.
    #[error("credential {existing} is already saved; confirmation required to replace it")]
    OverwriteConfirmationRequired { existing: Address },

    /// The expected credential is no longer in the vault.
    #[error("no saved credential")]
    NoSavedCredential,

    /// No wallet is connected.
    #[error("not connected")]
    NotConnected,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WardenError {
    pub fn is_wrong_password(&self) -> bool {
        matches!(self, WardenError::Keystore(KeystoreError::WrongPassword))
    }
}

/// Result type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
