//! # Warden Testkit
//!
//! Testing utilities for Warden.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Published keystore documents that must decrypt to a
//!   known key, so the codec stays compatible with other wallets
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust,no_run
//! use warden_testkit::vectors::{all_vectors, decrypt_vector};
//!
//! for vector in all_vectors() {
//!     let key = decrypt_vector(&vector).unwrap();
//!     println!("{}: {}", vector.name, key.address());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use warden_testkit::generators::{permission_state, permission_request};
//!
//! proptest! {
//!     #[test]
//!     fn own_state_needs_no_update(req in permission_request()) {
//!         let state = PermissionState::from_request(&req);
//!         prop_assert!(!should_update(&RemotePermissions::Deployed(state), &req, 0));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use warden_testkit::fixtures::WalletFixture;
//!
//! let fixture = WalletFixture::new();
//! let first = fixture.coordinator();
//! // A second coordinator over the same storage behaves like an app restart.
//! let restarted = fixture.coordinator();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{deterministic_key, fast_config, ChainFixture, WalletFixture};
