//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use warden::{ReconnectCoordinator, WardenConfig};
use warden_core::{Address, Amount, KeyMaterial};
use warden_keystore::KdfConfig;
use warden_perms::chain::memory::MemoryChain;
use warden_perms::{
    LocalSigner, PermissionDomain, PermissionReconciler, PermissionSigner, SessionPermissions,
    TargetSelection, ValidityWindow,
};
use warden_vault::{MemoryBackend, Vault};

/// Cheap scrypt parameters so tests do not spend seconds in the KDF.
pub fn fast_kdf() -> KdfConfig {
    KdfConfig::scrypt(4, 8, 1)
}

/// Default configuration with [`fast_kdf`] in the `test` namespace.
pub fn fast_config() -> WardenConfig {
    WardenConfig {
        namespace: "test".to_string(),
        kdf: fast_kdf(),
        ..WardenConfig::default()
    }
}

/// A valid key derived from `index`. Distinct indexes give distinct keys.
pub fn deterministic_key(index: u8) -> KeyMaterial {
    let mut secret = [0x11u8; 32];
    secret[31] = index;
    secret[0] = 0x01;
    match KeyMaterial::from_private_key(&secret) {
        Ok(key) => key,
        Err(e) => panic!("fixture key {} is invalid: {}", index, e),
    }
}

pub type TestCoordinator = ReconnectCoordinator<Vault<Arc<MemoryBackend>>>;

/// Shared in-memory storage that can back several coordinators.
pub struct WalletFixture {
    pub backend: Arc<MemoryBackend>,
    pub config: WardenConfig,
}

impl WalletFixture {
    /// Insecure storage: credentials must be password-secured.
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    /// Storage that accepts platform-secured credentials.
    pub fn platform_secured() -> Self {
        Self::with_backend(MemoryBackend::platform_secured())
    }

    pub fn with_backend(backend: MemoryBackend) -> Self {
        Self {
            backend: Arc::new(backend),
            config: fast_config(),
        }
    }

    /// Vault keys are prefixed with this.
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// A vault over the shared storage.
    pub fn vault(&self) -> Vault<Arc<MemoryBackend>> {
        Vault::new(self.backend.clone(), self.config.namespace.clone())
    }

    /// A fresh coordinator. Calling this again simulates a restart.
    pub fn coordinator(&self) -> TestCoordinator {
        ReconnectCoordinator::with_backend(self.backend.clone(), self.config.clone())
    }
}

impl Default for WalletFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A smart account on a simulated chain with its admin key attached.
pub struct ChainFixture {
    pub admin: Address,
    pub domain: PermissionDomain,
    pub now: u64,
}

impl ChainFixture {
    pub const CHAIN_ID: u64 = 8453;
    const ADMIN_KEY: u8 = 0xad;

    /// Fixed clock at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            admin: deterministic_key(Self::ADMIN_KEY).address(),
            domain: PermissionDomain::account(Self::CHAIN_ID, Address::from_bytes([0xac; 20])),
            now,
        }
    }

    /// A signer for the account's domain with the admin attached.
    pub fn signer(&self) -> PermissionSigner {
        let mut signer = PermissionSigner::new(self.domain.clone());
        signer.attach(Arc::new(LocalSigner::new(deterministic_key(Self::ADMIN_KEY))));
        signer
    }

    /// An undeployed account at `now`.
    pub fn chain(&self) -> MemoryChain {
        let chain = MemoryChain::new(self.domain.clone(), self.admin);
        chain.set_now(self.now);
        chain
    }

    pub fn reconciler(&self) -> PermissionReconciler<MemoryChain> {
        PermissionReconciler::new(self.chain(), self.signer())
    }

    /// One day of access to two contracts with a 1 ether limit.
    pub fn daily_permissions(&self) -> SessionPermissions {
        SessionPermissions::new(
            TargetSelection::Only(vec![
                Address::from_bytes([0x11; 20]),
                Address::from_bytes([0x22; 20]),
            ]),
            Amount::from_ether(1),
            ValidityWindow::starting_now(self.now, Duration::from_secs(86_400)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden::CoordinatorState;

    #[test]
    fn test_deterministic_keys_are_distinct() {
        let a = deterministic_key(1);
        let b = deterministic_key(2);
        assert_eq!(a.address(), deterministic_key(1).address());
        assert_ne!(a.address(), b.address());
    }

    #[tokio::test]
    async fn test_coordinators_share_storage() {
        let fixture = WalletFixture::new();
        let first = fixture.coordinator();
        let id = first.generate(Some("pw")).await.unwrap();

        let second = fixture.coordinator();
        assert_eq!(second.state().await, CoordinatorState::HasSavedCredential(id));
    }

    #[test]
    fn test_chain_fixture_admin() {
        let fixture = ChainFixture::new(1_700_000_000);
        assert_eq!(fixture.chain().admin(), fixture.admin);
        assert_eq!(fixture.signer().signer_address(), Some(fixture.admin));
    }
}
