//! # Warden Core
//!
//! Pure primitives for Warden: secp256k1 key material, addresses, and
//! recoverable signatures.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`KeyMaterial`] - An owned private key and its derived address
//! - [`Address`] - 20-byte account address (`ZERO` doubles as the wildcard sentinel)
//! - [`Signature`] - 65-byte recoverable ECDSA signature
//! - [`Keccak256Hash`] - Keccak-256 digest
//! - [`Amount`] - Native token amount in wei

pub mod crypto;
pub mod error;
pub mod key;
pub mod types;

pub use crypto::{address_of, Keccak256Hash, Signature};
pub use error::{CoreError, Result};
pub use key::{KeyMaterial, PRIVATE_KEY_LEN};
pub use types::{Address, Amount};
