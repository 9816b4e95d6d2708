//! Credential vault over a [`StorageBackend`].
//!
//! Layout under a namespace `ns`:
//!
//! - `ns/credential/<address>`: one CBOR-encoded [`StoredCredential`]
//! - `ns/index`: CBOR list of saved ids, oldest first
//!
//! `save` writes the index entry before the credential, and every index
//! read is filtered against the credentials that actually exist. A save
//! interrupted between the two writes therefore leaves only an index
//! entry, which is invisible. Credential writes rely on the backend's
//! all-or-nothing `set`.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use warden_core::Address;

use crate::credential::StoredCredential;
use crate::error::{Result, VaultError};
use crate::locks::IdLocks;
use crate::traits::{BackendCapabilities, CredentialVault, StorageBackend};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "warden";

/// A [`CredentialVault`] over any backend.
pub struct Vault<B> {
    backend: B,
    namespace: String,
    capabilities: BackendCapabilities,
    id_locks: IdLocks,
    index_lock: Mutex<()>,
}

impl<B: StorageBackend> Vault<B> {
    /// Wrap a backend. Capabilities are read once, here.
    pub fn new(backend: B, namespace: impl Into<String>) -> Self {
        let capabilities = backend.capabilities();
        let namespace = namespace.into();
        debug!(
            namespace = %namespace,
            secure = capabilities.secure,
            persistent = capabilities.persistent,
            "opened credential vault"
        );
        Self {
            backend,
            namespace,
            capabilities,
            id_locks: IdLocks::new(),
            index_lock: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn credential_key(&self, id: &Address) -> String {
        format!("{}/credential/{}", self.namespace, id.to_hex())
    }

    fn index_key(&self) -> String {
        format!("{}/index", self.namespace)
    }

    async fn read_index(&self) -> Result<Vec<Address>> {
        match self.backend.get(&self.index_key()).await? {
            None => Ok(Vec::new()),
            Some(bytes) => ciborium::from_reader(&bytes[..])
                .map_err(|e| VaultError::Serialization(format!("index: {}", e))),
        }
    }

    async fn write_index(&self, ids: &[Address]) -> Result<()> {
        let mut buf = Vec::new();
        ciborium::into_writer(&ids, &mut buf)
            .map_err(|e| VaultError::Serialization(format!("index: {}", e)))?;
        self.backend.set(&self.index_key(), &buf).await
    }
}

#[async_trait]
impl<B: StorageBackend> CredentialVault for Vault<B> {
    async fn save(&self, credential: &StoredCredential) -> Result<()> {
        if credential.secret.is_platform_secured() && !self.capabilities.secure {
            warn!(id = %credential.id, "refusing to store raw key on insecure backend");
            return Err(VaultError::PlatformStorageUnavailable);
        }

        let encoded = credential.to_bytes()?;
        let _id_guard = self.id_locks.lock(&credential.id).await;

        {
            let _index_guard = self.index_lock.lock().await;
            let mut ids = self.read_index().await?;
            if !ids.contains(&credential.id) {
                ids.push(credential.id);
                self.write_index(&ids).await?;
            }
        }

        self.backend
            .set(&self.credential_key(&credential.id), &encoded)
            .await
            .map_err(|e| {
                warn!(id = %credential.id, error = %e, "credential write failed");
                e
            })?;

        debug!(id = %credential.id, name = %credential.name, "saved credential");
        Ok(())
    }

    async fn load(&self, id: &Address) -> Result<Option<StoredCredential>> {
        let _id_guard = self.id_locks.lock(id).await;
        match self.backend.get(&self.credential_key(id)).await? {
            None => Ok(None),
            Some(bytes) => {
                let credential = StoredCredential::from_bytes(&bytes)?;
                if credential.id != *id {
                    return Err(VaultError::Serialization(format!(
                        "credential stored under {} claims id {}",
                        id, credential.id
                    )));
                }
                Ok(Some(credential))
            }
        }
    }

    async fn remove(&self, id: &Address) -> Result<()> {
        let _id_guard = self.id_locks.lock(id).await;
        self.backend.delete(&self.credential_key(id)).await?;

        let _index_guard = self.index_lock.lock().await;
        let mut ids = self.read_index().await?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() != before {
            self.write_index(&ids).await?;
        }

        debug!(id = %id, "removed credential");
        Ok(())
    }

    async fn has(&self, id: &Address) -> Result<bool> {
        Ok(self.backend.get(&self.credential_key(id)).await?.is_some())
    }

    async fn ids(&self) -> Result<Vec<Address>> {
        let indexed = {
            let _index_guard = self.index_lock.lock().await;
            self.read_index().await?
        };
        let mut present = Vec::with_capacity(indexed.len());
        for id in indexed {
            if self.has(&id).await? {
                present.push(id);
            }
        }
        Ok(present)
    }

    fn is_secure_storage_available(&self) -> bool {
        self.capabilities.secure
    }
}
