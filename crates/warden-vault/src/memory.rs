//! In-memory storage backend.
//!
//! Nothing survives the process. [`MemoryBackend::platform_secured`]
//! stands in for an OS credential store; [`MemoryBackend::new`] behaves
//! like a plain blob store (browser local storage, a config file).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};
use crate::traits::{BackendCapabilities, StorageBackend};

/// In-memory key/value backend. Thread-safe via RwLock.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
    capabilities: BackendCapabilities,
}

impl MemoryBackend {
    /// A plain, insecure backend.
    pub fn new() -> Self {
        Self::with_capabilities(BackendCapabilities::default())
    }

    /// A backend that reports platform-secured storage.
    pub fn platform_secured() -> Self {
        Self::with_capabilities(BackendCapabilities {
            secure: true,
            persistent: false,
        })
    }

    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capabilities,
        }
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> VaultError {
    VaultError::StorageUnavailable(format!("lock poisoned: {}", e))
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).map(|v| v.to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), Zeroizing::new(value.to_vec()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
