//! The on-chain permission layer of a smart account.

use async_trait::async_trait;
use warden_core::{Address, Keccak256Hash};

use crate::error::Result;
use crate::policy::RemotePermissions;
use crate::signer::SignedPermissionRequest;

/// Receipt of a mined permission transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: Keccak256Hash,
    pub block_number: u64,
}

/// Read and write session permissions of one smart account.
#[async_trait]
pub trait ChainPermissions: Send + Sync {
    /// Current permissions of `signer`.
    async fn read(&self, signer: &Address) -> Result<RemotePermissions>;

    /// Submit a signed request.
    ///
    /// Fails with `TransactionReverted`, `TransactionRejectedByUser` or
    /// `ChainUnavailable`.
    async fn write(&self, signed: &SignedPermissionRequest) -> Result<TransactionReceipt>;
}

/// In-memory simulation of the account contract, for tests and demos.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicU64, Ordering};

    use tokio::sync::RwLock;
    use tracing::debug;

    use crate::error::PermsError;
    use crate::policy::PermissionState;
    use crate::request::{unix_now, Nonce};
    use crate::typed_data::PermissionDomain;

    /// How the next write should fail.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum WriteFailure {
        RejectedByUser,
        Reverted(String),
        Unavailable(String),
    }

    struct ChainState {
        deployed: bool,
        block_number: u64,
        permissions: HashMap<Address, PermissionState>,
        used_nonces: HashSet<Nonce>,
        next_failure: Option<WriteFailure>,
    }

    /// A single smart account with one admin.
    ///
    /// Writes are checked the way the contract checks them: the signature
    /// must recover to the admin under the account's domain, the nonce must
    /// be unused and the request must be inside its validity window. The
    /// first successful write deploys the account.
    pub struct MemoryChain {
        domain: PermissionDomain,
        admin: Address,
        now: AtomicU64,
        state: RwLock<ChainState>,
    }

    impl MemoryChain {
        /// An undeployed account administered by `admin`.
        pub fn new(domain: PermissionDomain, admin: Address) -> Self {
            Self::with_deployment(domain, admin, false)
        }

        /// An already deployed account.
        pub fn deployed(domain: PermissionDomain, admin: Address) -> Self {
            Self::with_deployment(domain, admin, true)
        }

        fn with_deployment(domain: PermissionDomain, admin: Address, deployed: bool) -> Self {
            Self {
                domain,
                admin,
                now: AtomicU64::new(unix_now()),
                state: RwLock::new(ChainState {
                    deployed,
                    block_number: 1,
                    permissions: HashMap::new(),
                    used_nonces: HashSet::new(),
                    next_failure: None,
                }),
            }
        }

        pub fn domain(&self) -> &PermissionDomain {
            &self.domain
        }

        pub fn admin(&self) -> Address {
            self.admin
        }

        /// Chain time in Unix seconds.
        pub fn now(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }

        pub fn set_now(&self, now: u64) {
            self.now.store(now, Ordering::SeqCst);
        }

        /// Overwrite a signer's state directly.
        pub async fn set_permissions(&self, signer: Address, state: PermissionState) {
            let mut chain = self.state.write().await;
            chain.deployed = true;
            chain.permissions.insert(signer, state);
        }

        /// Make the next `write` fail.
        pub async fn fail_next_write(&self, failure: WriteFailure) {
            self.state.write().await.next_failure = Some(failure);
        }

        /// Make the next `write` fail as if the user declined the transaction.
        pub async fn reject_next_write(&self) {
            self.fail_next_write(WriteFailure::RejectedByUser).await;
        }

        pub async fn is_deployed(&self) -> bool {
            self.state.read().await.deployed
        }

        /// Number of successful writes.
        pub async fn writes(&self) -> u64 {
            self.state.read().await.block_number - 1
        }
    }

    #[async_trait]
    impl ChainPermissions for MemoryChain {
        async fn read(&self, signer: &Address) -> Result<RemotePermissions> {
            let state = self.state.read().await;
            if !state.deployed {
                return Ok(RemotePermissions::AccountNotDeployed);
            }
            Ok(RemotePermissions::Deployed(
                state
                    .permissions
                    .get(signer)
                    .cloned()
                    .unwrap_or_else(PermissionState::none),
            ))
        }

        async fn write(&self, signed: &SignedPermissionRequest) -> Result<TransactionReceipt> {
            let mut state = self.state.write().await;

            match state.next_failure.take() {
                Some(WriteFailure::RejectedByUser) => {
                    return Err(PermsError::TransactionRejectedByUser)
                }
                Some(WriteFailure::Reverted(reason)) => {
                    return Err(PermsError::TransactionReverted(reason))
                }
                Some(WriteFailure::Unavailable(reason)) => {
                    return Err(PermsError::ChainUnavailable(reason))
                }
                None => {}
            }

            let request = &signed.request;
            let recovered = signed
                .recover_signer(&self.domain)
                .map_err(|_| PermsError::TransactionReverted("invalid signature".into()))?;
            if recovered != self.admin {
                return Err(PermsError::TransactionReverted(
                    "signer is not the account admin".into(),
                ));
            }
            if !request.request_validity.contains(self.now()) {
                return Err(PermsError::TransactionReverted(
                    "request outside its validity window".into(),
                ));
            }
            if !state.used_nonces.insert(request.nonce) {
                return Err(PermsError::TransactionReverted("nonce already used".into()));
            }

            state.deployed = true;
            state
                .permissions
                .insert(request.signer, PermissionState::from_request(request));
            let block_number = state.block_number;
            state.block_number += 1;

            let transaction_hash = Keccak256Hash::hash_parts(&[
                signed.signature.as_bytes(),
                request.nonce.as_bytes(),
            ]);
            debug!(
                session_signer = %request.signer,
                block = block_number,
                "permission write mined"
            );
            Ok(TransactionReceipt {
                transaction_hash,
                block_number,
            })
        }
    }
}
