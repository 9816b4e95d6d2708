//! Symmetric cipher for keystore payloads.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{KeystoreError, Result};

/// The only cipher name this codec reads or writes.
pub const AES_128_CTR: &str = "aes-128-ctr";

/// AES block size, and so the IV length.
pub const IV_LEN: usize = 16;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// A random 16-byte IV.
pub fn fresh_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Check a document cipher name.
pub fn check_cipher(name: &str) -> Result<()> {
    if name == AES_128_CTR {
        Ok(())
    } else {
        Err(KeystoreError::CorruptKeystore(format!(
            "unsupported cipher: {}",
            name
        )))
    }
}

/// Apply the AES-128-CTR keystream in place. Encrypts and decrypts.
pub fn apply_keystream(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    let mut cipher = Aes128Ctr::new_from_slices(key, iv)
        .map_err(|_| KeystoreError::CorruptKeystore("bad cipher key or iv length".into()))?;
    cipher.apply_keystream(data);
    Ok(())
}
