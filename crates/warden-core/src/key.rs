//! Private key material.
//!
//! [`KeyMaterial`] is the only holder of a raw secp256k1 secret in the
//! workspace. It is deliberately not `Clone` and not `Serialize`: the secret
//! leaves it only as ciphertext, as a zeroizing copy handed to a secure
//! store, or as a signature.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

use crate::crypto::{address_of, Signature};
use crate::error::{CoreError, Result};
use crate::types::Address;

/// Length of a secp256k1 private key in bytes.
pub const PRIVATE_KEY_LEN: usize = 32;

/// A secp256k1 signing key together with its derived address.
///
/// The secret scalar is zeroized on drop (k256 `SigningKey` zeroizes itself).
pub struct KeyMaterial {
    signing_key: SigningKey,
    address: Address,
}

impl KeyMaterial {
    /// Generate a new random key from the OS CSPRNG.
    ///
    /// Draws 32 bytes and retries if they do not form a valid scalar.
    pub fn generate() -> Self {
        loop {
            let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
            OsRng.fill_bytes(bytes.as_mut());
            if let Ok(key) = Self::from_private_key(bytes.as_ref()) {
                return key;
            }
        }
    }

    /// Import a raw 32-byte private key.
    ///
    /// Fails with [`CoreError::InvalidKey`] if the length is wrong or the
    /// value is zero or not below the curve order.
    pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CoreError::InvalidKey);
        }
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| CoreError::InvalidKey)?;
        let address = address_of(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Import a hex-encoded private key, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = Zeroizing::new(hex::decode(stripped).map_err(|_| CoreError::InvalidKey)?);
        Self::from_private_key(&bytes)
    }

    /// The address derived from this key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a caller-supplied 32-byte digest.
    ///
    /// Deterministic (RFC 6979). Domain separation is the caller's job.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|_| CoreError::InvalidSignature)?;
        Ok(Signature::from_parts(&signature, recovery_id))
    }

    /// A zeroizing copy of the secret scalar.
    ///
    /// Only for encryption or hand-off to a platform-secured store.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({})", self.address)
    }
}
