//! # Warden
//!
//! Wallet credential lifecycle and delegated session permissions.
//!
//! ## Overview
//!
//! Warden keeps a wallet's private key safe at rest and drives the user
//! through setting it up, unlocking it and moving it between devices:
//!
//! - **Keystore**: password-encrypted Web3 Secret Storage v3 documents
//! - **Vault**: namespaced credential storage over a pluggable backend
//! - **Coordinator**: the reconnect state machine (generate, connect,
//!   import, export, remove)
//! - **Permissions**: signed grants for delegated session signers and the
//!   policy deciding when they must be rewritten on-chain
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden::{ReconnectCoordinator, WardenConfig};
//! use warden::vault::SqliteBackend;
//!
//! async fn example() {
//!     let backend = SqliteBackend::open("warden.db").unwrap();
//!     // Credentials live under `config.namespace`.
//!     let config = WardenConfig::from_json(r#"{"namespace": "app"}"#).unwrap();
//!     let coordinator = ReconnectCoordinator::with_backend(backend, config);
//!
//!     if coordinator.state().await.credential_id().is_some() {
//!         coordinator.connect(Some("correct-horse")).await.unwrap();
//!     } else {
//!         coordinator.generate(Some("correct-horse")).await.unwrap();
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `warden::core` - Addresses, amounts, keys and signatures
//! - `warden::keystore` - Keystore codec
//! - `warden::vault` - Storage backends and the credential vault
//! - `warden::perms` - Session permissions

pub mod config;
pub mod coordinator;
pub mod error;
pub mod session;
pub mod state;

pub use warden_core as core;
pub use warden_keystore as keystore;
pub use warden_perms as perms;
pub use warden_vault as vault;

pub use config::WardenConfig;
pub use coordinator::{ImportOutcome, PendingImport, ReconnectCoordinator};
pub use error::{Result, WardenError};
pub use session::ConnectionSession;
pub use state::{CoordinatorState, FailureReason};

pub use warden_core::{Address, Amount, KeyMaterial, Signature};
