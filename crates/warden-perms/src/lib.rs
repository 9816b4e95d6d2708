//! # Warden Permissions
//!
//! Session permissions for smart accounts: what a delegated session signer
//! may do, how that grant is signed, and when it must be written on-chain.
//!
//! ## Key Concepts
//!
//! - **PermissionRequest**: targets, per-transaction native token limit,
//!   permission window and request validity window for one session signer
//! - **Wildcard target**: any contract, encoded on-chain as `[0x000…0]`
//! - **Update policy**: [`should_update`] decides whether the remote state
//!   already covers a request, so no transaction is paid for needlessly
//! - **Signer**: one capability implemented by [`LocalSigner`] and
//!   [`InteractiveSigner`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_core::{Address, Amount, KeyMaterial};
//! use warden_perms::{
//!     build_request, unix_now, LocalSigner, Nonce, PermissionDomain, PermissionSigner,
//!     SessionPermissions, TargetSelection, ValidityWindow,
//! };
//!
//! async fn example(admin: KeyMaterial, session: Address, account: Address) {
//!     let mut signer = PermissionSigner::new(PermissionDomain::account(1, account));
//!     signer.attach(Arc::new(LocalSigner::new(admin)));
//!
//!     let perms = SessionPermissions::new(
//!         TargetSelection::Wildcard,
//!         Amount::from_ether(1),
//!         ValidityWindow::starting_now(unix_now(), Duration::from_secs(86_400)),
//!     );
//!     let request = build_request(session, &perms, Nonce::random()).unwrap();
//!     let signed = signer.sign(&request).await.unwrap();
//!     // chain.write(&signed).await
//! }
//! ```

pub mod chain;
pub mod error;
pub mod policy;
pub mod reconcile;
pub mod request;
pub mod signer;
pub mod typed_data;

pub use chain::{ChainPermissions, TransactionReceipt};
pub use error::{PermsError, Result};
pub use policy::{decide, should_update, PermissionState, RemotePermissions, UpdateReason};
pub use reconcile::{PermissionReconciler, ReconcileOutcome};
pub use request::{
    build_request, is_wildcard, unix_now, Nonce, PermissionRequest, SessionPermissions,
    TargetSelection, ValidityWindow,
};
pub use signer::{
    InteractiveSigner, LocalSigner, PermissionSigner, SignatureRequest, SignedPermissionRequest,
    Signer,
};
pub use typed_data::{struct_hash, PermissionDomain};
