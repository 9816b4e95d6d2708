//! Storage traits: the byte-level backend and the credential-level vault.
//!
//! Backends know nothing about credentials. The vault layers naming,
//! encoding and the credential index on top of any backend.

use std::sync::Arc;

use async_trait::async_trait;
use warden_core::Address;

use crate::credential::StoredCredential;
use crate::error::Result;

/// What a backend can promise about the bytes it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    /// Values are protected by the platform (OS keychain, secure enclave)
    /// and may hold unencrypted key material.
    pub secure: bool,
    /// Values survive a process restart.
    pub persistent: bool,
}

/// Async key/value storage.
///
/// `set` must be all-or-nothing: after a failed `set` the previous value
/// (or absence) is still observable.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Capabilities of this backend. Pure; never touches storage.
    fn capabilities(&self) -> BackendCapabilities;

    /// Read a value. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn capabilities(&self) -> BackendCapabilities {
        (**self).capabilities()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}

/// Credential persistence keyed by address.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    /// Persist a credential, replacing any with the same id.
    ///
    /// Either the whole credential becomes visible or nothing changes.
    async fn save(&self, credential: &StoredCredential) -> Result<()>;

    /// Load a credential. Nothing saved is `Ok(None)`.
    async fn load(&self, id: &Address) -> Result<Option<StoredCredential>>;

    /// Remove a credential. Removing a missing one succeeds.
    async fn remove(&self, id: &Address) -> Result<()>;

    /// Whether a credential is saved under `id`.
    async fn has(&self, id: &Address) -> Result<bool>;

    /// Ids of all saved credentials, oldest first.
    async fn ids(&self) -> Result<Vec<Address>>;

    /// Whether raw keys may be stored without password encryption.
    fn is_secure_storage_available(&self) -> bool;
}
