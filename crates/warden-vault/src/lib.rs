//! # Warden Vault
//!
//! Credential persistence for Warden. A [`Vault`] stores [`StoredCredential`]s
//! on top of any [`StorageBackend`], keeping a namespaced index of saved ids.
//!
//! ## Key Types
//!
//! - [`StorageBackend`] - async key/value storage with declared capabilities
//! - [`MemoryBackend`] - in-memory backend, optionally reporting platform security
//! - [`SqliteBackend`] - SQLite-based persistent backend
//! - [`CredentialVault`] - credential-level operations
//! - [`Vault`] - the `CredentialVault` implementation
//! - [`IdLocks`] - per-credential async locks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_vault::{CredentialVault, SqliteBackend, Vault};
//!
//! async fn example() {
//!     let vault = Vault::new(SqliteBackend::open("warden.db").unwrap(), "warden");
//!     for id in vault.ids().await.unwrap() {
//!         println!("saved: {}", id);
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Raw keys need a secure backend**: `PlatformSecured` secrets are refused
//!   by backends that do not report `secure`
//! - **No partial credentials**: an interrupted save is never observable
//! - **Missing is not an error**: loading an unknown id returns `Ok(None)`

pub mod credential;
pub mod error;
pub mod locks;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;
pub mod vault;

pub use credential::{CredentialSecret, RawKey, StoredCredential};
pub use error::{Result, VaultError};
pub use locks::IdLocks;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{BackendCapabilities, CredentialVault, StorageBackend};
pub use vault::{Vault, DEFAULT_NAMESPACE};
