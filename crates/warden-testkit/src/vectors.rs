//! Golden keystore vectors.
//!
//! The Web3 Secret Storage test vectors, as published with the format and
//! checked by geth and ethers. A codec that decrypts them reads documents
//! written by those wallets.

use warden_core::KeyMaterial;
use warden_keystore::{EncryptedKeystore, KeystoreCodec};

/// A golden keystore document.
#[derive(Debug, Clone)]
pub struct KeystoreVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The document as another wallet wrote it.
    pub json: &'static str,
    pub password: &'static str,
    /// Expected private key (hex).
    pub expected_private_key: &'static str,
}

const PBKDF2_VECTOR: &str = r#"{
    "crypto" : {
        "cipher" : "aes-128-ctr",
        "cipherparams" : {
            "iv" : "6087dab2f9fdbbfaddc31a909735c1e6"
        },
        "ciphertext" : "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
        "kdf" : "pbkdf2",
        "kdfparams" : {
            "c" : 262144,
            "dklen" : 32,
            "prf" : "hmac-sha256",
            "salt" : "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
        },
        "mac" : "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
    },
    "id" : "3198bc9c-6672-5ab3-d995-4942343ae5b6",
    "version" : 3
}"#;

const SCRYPT_VECTOR: &str = r#"{
    "crypto" : {
        "cipher" : "aes-128-ctr",
        "cipherparams" : {
            "iv" : "83dbcc02d8ccb40e466191a123791e0e"
        },
        "ciphertext" : "d172bf743a674da9cdad04534d56926ef8358534d458fffccd4e6ad2fbde479c",
        "kdf" : "scrypt",
        "kdfparams" : {
            "dklen" : 32,
            "n" : 262144,
            "p" : 8,
            "r" : 1,
            "salt" : "ab0c7876052600dd703518d6fc3fe8984592145b591fc8fb5c6d43190334ba19"
        },
        "mac" : "2103ac29920d71da29f15d75b4a16dbe95cfd7ff8faea1056c33131d846e3097"
    },
    "id" : "3198bc9c-6672-5ab3-d995-4942343ae5b6",
    "version" : 3
}"#;

const GOLDEN_PRIVATE_KEY: &str =
    "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d";

/// Get all golden keystore vectors.
pub fn all_vectors() -> Vec<KeystoreVector> {
    vec![
        KeystoreVector {
            name: "pbkdf2 hmac-sha256, c = 262144",
            json: PBKDF2_VECTOR,
            password: "testpassword",
            expected_private_key: GOLDEN_PRIVATE_KEY,
        },
        KeystoreVector {
            name: "scrypt n = 262144, r = 1, p = 8",
            json: SCRYPT_VECTOR,
            password: "testpassword",
            expected_private_key: GOLDEN_PRIVATE_KEY,
        },
    ]
}

/// Parse and decrypt a vector with its password.
pub fn decrypt_vector(vector: &KeystoreVector) -> warden_keystore::Result<KeyMaterial> {
    let doc = EncryptedKeystore::from_json(vector.json)?;
    KeystoreCodec::decrypt_key(&doc, vector.password.as_bytes())
}

/// Decrypt every vector and compare against the expected key.
///
/// Returns the names of vectors that failed.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|vector| {
            let expected = hex::decode(vector.expected_private_key).unwrap_or_default();
            !matches!(
                decrypt_vector(vector),
                Ok(key) if key.secret_bytes()[..] == expected[..]
            )
        })
        .map(|vector| vector.name)
        .collect()
}
