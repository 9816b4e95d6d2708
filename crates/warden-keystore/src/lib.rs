//! Warden Keystore - password-encrypted private keys.
//!
//! Reads and writes the Web3 Secret Storage (v3) JSON format, so documents
//! round-trip with geth, ethers and most browser wallets.
//!
//! - **KDF**: scrypt or PBKDF2-HMAC-SHA256, parameters stored in the document
//! - **Cipher**: AES-128-CTR keyed with the first half of the derived key
//! - **MAC**: Keccak-256 over the second half of the derived key and the ciphertext
//!
//! A MAC mismatch is the only condition reported as a wrong password.

pub mod cipher;
pub mod codec;
pub mod document;
pub mod error;
pub mod kdf;
mod romix;

pub use codec::KeystoreCodec;
pub use document::{CipherParams, CryptoSection, EncryptedKeystore, CURRENT_VERSION, SUPPORTED_VERSIONS};
pub use error::{KeystoreError, Result};
pub use kdf::{KdfConfig, KdfParams, Pbkdf2Params, ScryptParams};
