//! The keystore JSON document.
//!
//! Wire-compatible with the Web3 Secret Storage (v3) format written by geth,
//! ethers and most wallets. `kdfparams` stays an untyped JSON object so
//! documents from unrelated tools survive a parse/serialize round trip,
//! and unknown top-level fields are carried along in `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warden_core::Address;

use crate::error::{KeystoreError, Result};

/// Version written by this codec.
pub const CURRENT_VERSION: u32 = 3;

/// Versions this codec reads.
pub const SUPPORTED_VERSIONS: &[u32] = &[3];

/// A password-encrypted private key document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedKeystore {
    pub version: u32,

    /// Random UUID; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Address as 40 hex chars without `0x`. Optional on input.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "bare_address")]
    pub address: Option<Address>,

    /// Older geth releases wrote `Crypto`.
    #[serde(alias = "Crypto")]
    pub crypto: CryptoSection,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The `crypto` section of a keystore document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoSection {
    pub cipher: String,
    pub cipherparams: CipherParams,
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    pub kdf: String,
    pub kdfparams: serde_json::Value,
    #[serde(with = "hex_bytes")]
    pub mac: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CipherParams {
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
}

impl EncryptedKeystore {
    /// Parse a document from JSON.
    ///
    /// Any structural problem is reported as [`KeystoreError::CorruptKeystore`].
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KeystoreError::CorruptKeystore(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| KeystoreError::CorruptKeystore(e.to_string()))
    }

    /// Serialize to indented JSON, for files a human may open.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KeystoreError::CorruptKeystore(e.to_string()))
    }

    /// Check the version against [`SUPPORTED_VERSIONS`].
    pub fn check_version(&self) -> Result<()> {
        if SUPPORTED_VERSIONS.contains(&self.version) {
            Ok(())
        } else {
            Err(KeystoreError::UnsupportedVersion(self.version))
        }
    }
}

/// Hex byte strings, tolerating a `0x` prefix on input.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}

mod bare_address {
    use serde::{Deserialize, Deserializer, Serializer};
    use warden_core::Address;

    pub fn serialize<S: Serializer>(
        address: &Option<Address>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match address {
            Some(addr) => serializer.serialize_str(&addr.to_hex()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Address>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) if !s.is_empty() => Address::from_hex(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "version": 3,
        "id": "3198bc9c-6672-5ab3-d995-4942343ae5b6",
        "address": "008aeeda4d805471df9b2a5b0f38a0c3bcba786b",
        "crypto": {
            "cipher": "aes-128-ctr",
            "cipherparams": { "iv": "6087dab2f9fdbbfaddc31a909735c1e6" },
            "ciphertext": "5318b4d5bcd28de64ee5559e671353e16f075ecae9f99c7a79a38af5f869aa46",
            "kdf": "pbkdf2",
            "kdfparams": {
                "c": 262144,
                "dklen": 32,
                "prf": "hmac-sha256",
                "salt": "ae3cd4e7013836a3df6bd7241b12db061dbe2c6785853cce422d148a624ce0bd"
            },
            "mac": "517ead924a9d0dc3124507e3393d175ce3ff7c1e96529c6c555ce9e51205e9b2"
        },
        "x-vendor": { "note": "kept" }
    }"#;

    #[test]
    fn test_parse_and_reserialize() {
        let doc = EncryptedKeystore::from_json(DOC).unwrap();
        assert_eq!(doc.version, 3);
        assert_eq!(doc.crypto.cipher, "aes-128-ctr");
        assert_eq!(doc.crypto.cipherparams.iv.len(), 16);
        assert_eq!(doc.extra.get("x-vendor").unwrap()["note"], "kept");

        let json = doc.to_json().unwrap();
        let again = EncryptedKeystore::from_json(&json).unwrap();
        assert_eq!(doc, again);
        assert!(json.contains("\"address\":\"008aeeda4d805471df9b2a5b0f38a0c3bcba786b\""));
    }

    #[test]
    fn test_legacy_capitalized_crypto() {
        let legacy = DOC.replace("\"crypto\"", "\"Crypto\"");
        let doc = EncryptedKeystore::from_json(&legacy).unwrap();
        assert_eq!(doc.crypto.kdf, "pbkdf2");
        assert!(doc.to_json().unwrap().contains("\"crypto\""));
    }

    #[test]
    fn test_structural_errors_are_corrupt() {
        let err = EncryptedKeystore::from_json("{\"version\":3}").unwrap_err();
        assert!(matches!(err, KeystoreError::CorruptKeystore(_)));

        let bad_hex = DOC.replace("6087dab2", "zz87dab2");
        let err = EncryptedKeystore::from_json(&bad_hex).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_version_check() {
        let mut doc = EncryptedKeystore::from_json(DOC).unwrap();
        assert!(doc.check_version().is_ok());
        doc.version = 1;
        assert_eq!(
            doc.check_version().unwrap_err(),
            KeystoreError::UnsupportedVersion(1)
        );
    }
}
