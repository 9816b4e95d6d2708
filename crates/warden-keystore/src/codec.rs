//! Encrypt and decrypt private keys into keystore documents.
//!
//! Every `encrypt` draws a fresh salt and IV, so two encryptions of the
//! same key under the same password never produce the same document.
//! `decrypt` validates the MAC in constant time before the derived key is
//! used for anything else.

use std::collections::BTreeMap;

use subtle::ConstantTimeEq;
use tracing::debug;
use warden_core::{Keccak256Hash, KeyMaterial, PRIVATE_KEY_LEN};
use zeroize::Zeroizing;

use crate::cipher::{self, AES_128_CTR};
use crate::document::{CipherParams, CryptoSection, EncryptedKeystore, CURRENT_VERSION};
use crate::error::{KeystoreError, Result};
use crate::kdf::{KdfConfig, KdfParams};

/// Keystore encryption with a fixed KDF configuration.
///
/// Stateless apart from the configuration, so one codec can serve any
/// number of concurrent callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeystoreCodec {
    kdf: KdfConfig,
}

impl KeystoreCodec {
    /// Create a codec that writes documents with the given KDF settings.
    pub fn new(kdf: KdfConfig) -> Self {
        Self { kdf }
    }

    /// The KDF settings new documents are written with.
    pub fn kdf(&self) -> KdfConfig {
        self.kdf
    }

    /// Encrypt raw private key bytes.
    pub fn encrypt(&self, secret: &[u8], password: &[u8]) -> Result<EncryptedKeystore> {
        // Derive the address up front: it also validates the scalar.
        let address = KeyMaterial::from_private_key(secret)?.address();

        let params = self.kdf.fresh_params()?;
        let derived = params.derive(password)?;

        let iv = cipher::fresh_iv();
        let mut ciphertext = secret.to_vec();
        cipher::apply_keystream(&derived[..16], &iv, &mut ciphertext)?;

        let mac = compute_mac(&derived, &ciphertext);

        debug!(%address, kdf = params.name(), "encrypted keystore");

        Ok(EncryptedKeystore {
            version: CURRENT_VERSION,
            id: Some(uuid::Uuid::new_v4().to_string()),
            address: Some(address),
            crypto: CryptoSection {
                cipher: AES_128_CTR.to_string(),
                cipherparams: CipherParams { iv: iv.to_vec() },
                ciphertext,
                kdf: params.name().to_string(),
                kdfparams: params.to_value()?,
                mac: mac.to_vec(),
            },
            extra: BTreeMap::new(),
        })
    }

    /// Encrypt the secret held by `key`.
    pub fn encrypt_key(&self, key: &KeyMaterial, password: &[u8]) -> Result<EncryptedKeystore> {
        self.encrypt(&key.secret_bytes()[..], password)
    }

    /// Decrypt a document back to the private key bytes.
    ///
    /// Document problems are reported as [`KeystoreError::CorruptKeystore`] or
    /// [`KeystoreError::UnsupportedVersion`], never as a wrong password.
    pub fn decrypt(keystore: &EncryptedKeystore, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        keystore.check_version()?;

        let crypto = &keystore.crypto;
        cipher::check_cipher(&crypto.cipher)?;
        if crypto.cipherparams.iv.len() != cipher::IV_LEN {
            return Err(KeystoreError::CorruptKeystore(format!(
                "iv must be {} bytes",
                cipher::IV_LEN
            )));
        }
        if crypto.mac.len() != 32 {
            return Err(KeystoreError::CorruptKeystore("mac must be 32 bytes".into()));
        }
        let params = KdfParams::parse(&crypto.kdf, &crypto.kdfparams)?;

        let derived = params.derive(password)?;
        let expected = compute_mac(&derived, &crypto.ciphertext);
        if !bool::from(expected.ct_eq(crypto.mac.as_slice())) {
            return Err(KeystoreError::WrongPassword);
        }

        let mut secret = Zeroizing::new(crypto.ciphertext.clone());
        cipher::apply_keystream(&derived[..16], &crypto.cipherparams.iv, &mut secret)?;

        if let Some(address) = keystore.address {
            if secret.len() != PRIVATE_KEY_LEN {
                return Err(KeystoreError::CorruptKeystore(
                    "address present but secret is not a private key".into(),
                ));
            }
            let derived_address = KeyMaterial::from_private_key(&secret)
                .map_err(|_| KeystoreError::CorruptKeystore("secret is not a valid key".into()))?
                .address();
            if derived_address != address {
                return Err(KeystoreError::CorruptKeystore("address mismatch".into()));
            }
        }

        Ok(secret)
    }

    /// Decrypt a document straight into [`KeyMaterial`].
    pub fn decrypt_key(keystore: &EncryptedKeystore, password: &[u8]) -> Result<KeyMaterial> {
        let secret = Self::decrypt(keystore, password)?;
        Ok(KeyMaterial::from_private_key(&secret)?)
    }

    /// [`encrypt`](Self::encrypt) on the blocking thread pool.
    ///
    /// Dropping the returned future abandons the wait; the KDF finishes in
    /// the background and its output is discarded.
    pub async fn encrypt_async(
        &self,
        secret: Zeroizing<[u8; PRIVATE_KEY_LEN]>,
        password: Zeroizing<String>,
    ) -> Result<EncryptedKeystore> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.encrypt(&secret[..], password.as_bytes()))
            .await
            .map_err(|e| KeystoreError::Task(e.to_string()))?
    }

    /// [`decrypt_key`](Self::decrypt_key) on the blocking thread pool.
    pub async fn decrypt_async(
        keystore: EncryptedKeystore,
        password: Zeroizing<String>,
    ) -> Result<KeyMaterial> {
        tokio::task::spawn_blocking(move || Self::decrypt_key(&keystore, password.as_bytes()))
            .await
            .map_err(|e| KeystoreError::Task(e.to_string()))?
    }
}

/// `keccak256(dk[16..32] ‖ ciphertext)`.
fn compute_mac(derived: &[u8], ciphertext: &[u8]) -> [u8; 32] {
    Keccak256Hash::hash_parts(&[&derived[16..32], ciphertext]).0
}
