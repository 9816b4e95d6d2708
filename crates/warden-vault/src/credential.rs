//! Stored credentials and their persisted encoding.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use warden_core::{Address, CoreError, KeyMaterial, PRIVATE_KEY_LEN};
use warden_keystore::EncryptedKeystore;
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

/// Encoding version of persisted records.
const RECORD_VERSION: u8 = 1;

/// An unencrypted private key destined for a platform-secured backend.
///
/// Zeroized on drop. Never printed.
pub struct RawKey(Zeroizing<[u8; PRIVATE_KEY_LEN]>);

impl RawKey {
    pub fn from_key(key: &KeyMaterial) -> Self {
        Self(key.secret_bytes())
    }

    /// Rebuild the signing key.
    pub fn to_key(&self) -> std::result::Result<KeyMaterial, CoreError> {
        KeyMaterial::from_private_key(&self.0[..])
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawKey(<redacted>)")
    }
}

impl Serialize for RawKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0[..])
    }
}

impl<'de> Deserialize<'de> for RawKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RawKeyVisitor;

        impl<'de> Visitor<'de> for RawKeyVisitor {
            type Value = RawKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} key bytes", PRIVATE_KEY_LEN)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<RawKey, E> {
                if v.len() != PRIVATE_KEY_LEN {
                    return Err(E::invalid_length(v.len(), &self));
                }
                let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
                out.copy_from_slice(v);
                Ok(RawKey(out))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<RawKey, E> {
                let v = Zeroizing::new(v);
                self.visit_bytes(&v)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<RawKey, A::Error> {
                let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(RawKey(out))
            }
        }

        deserializer.deserialize_bytes(RawKeyVisitor)
    }
}

/// How a stored credential's key is protected.
#[derive(Debug)]
pub enum CredentialSecret {
    /// Password-encrypted keystore document.
    PasswordSecured(EncryptedKeystore),
    /// Raw key, only accepted by platform-secured backends.
    PlatformSecured(RawKey),
}

impl CredentialSecret {
    pub fn is_platform_secured(&self) -> bool {
        matches!(self, CredentialSecret::PlatformSecured(_))
    }
}

/// A credential as persisted in the vault.
#[derive(Debug)]
pub struct StoredCredential {
    /// Address of the key. Unique within a vault.
    pub id: Address,
    /// Human-readable label.
    pub name: String,
    pub secret: CredentialSecret,
}

impl StoredCredential {
    pub fn new(id: Address, name: impl Into<String>, secret: CredentialSecret) -> Self {
        Self {
            id,
            name: name.into(),
            secret,
        }
    }

    /// Encode to CBOR.
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let secret = match &self.secret {
            CredentialSecret::PasswordSecured(doc) => SecretRecordRef::Keystore(
                doc.to_json()
                    .map_err(|e| VaultError::Serialization(e.to_string()))?,
            ),
            CredentialSecret::PlatformSecured(raw) => SecretRecordRef::RawKey(raw),
        };
        let record = CredentialRecordRef {
            version: RECORD_VERSION,
            id: self.id,
            name: &self.name,
            secret,
        };
        let mut buf = Zeroizing::new(Vec::new());
        ciborium::into_writer(&record, &mut *buf)
            .map_err(|e| VaultError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: CredentialRecord =
            ciborium::from_reader(bytes).map_err(|e| VaultError::Serialization(e.to_string()))?;
        if record.version != RECORD_VERSION {
            return Err(VaultError::Serialization(format!(
                "unknown record version: {}",
                record.version
            )));
        }
        let secret = match record.secret {
            SecretRecord::Keystore(json) => CredentialSecret::PasswordSecured(
                EncryptedKeystore::from_json(&json)
                    .map_err(|e| VaultError::Serialization(e.to_string()))?,
            ),
            SecretRecord::RawKey(raw) => CredentialSecret::PlatformSecured(raw),
        };
        Ok(Self {
            id: record.id,
            name: record.name,
            secret,
        })
    }
}

#[derive(Serialize)]
struct CredentialRecordRef<'a> {
    version: u8,
    id: Address,
    name: &'a str,
    secret: SecretRecordRef<'a>,
}

#[derive(Serialize)]
#[serde(rename = "SecretRecord")]
enum SecretRecordRef<'a> {
    Keystore(String),
    RawKey(&'a RawKey),
}

#[derive(Deserialize)]
struct CredentialRecord {
    version: u8,
    id: Address,
    name: String,
    secret: SecretRecord,
}

#[derive(Deserialize)]
enum SecretRecord {
    Keystore(String),
    RawKey(RawKey),
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_keystore::{KdfConfig, KeystoreCodec};

    #[test]
    fn test_raw_key_roundtrip() {
        let key = KeyMaterial::generate();
        let cred = StoredCredential::new(
            key.address(),
            "device",
            CredentialSecret::PlatformSecured(RawKey::from_key(&key)),
        );

        let bytes = cred.to_bytes().unwrap();
        let back = StoredCredential::from_bytes(&bytes).unwrap();
        assert_eq!(back.id, key.address());
        assert_eq!(back.name, "device");
        match back.secret {
            CredentialSecret::PlatformSecured(raw) => {
                assert_eq!(raw.to_key().unwrap().address(), key.address());
            }
            other => panic!("unexpected secret: {:?}", other),
        }
    }

    #[test]
    fn test_keystore_roundtrip() {
        let key = KeyMaterial::generate();
        let doc = KeystoreCodec::new(KdfConfig::scrypt(4, 8, 1))
            .encrypt_key(&key, b"pw")
            .unwrap();
        let cred = StoredCredential::new(
            key.address(),
            "Wallet",
            CredentialSecret::PasswordSecured(doc.clone()),
        );

        let back = StoredCredential::from_bytes(&cred.to_bytes().unwrap()).unwrap();
        match back.secret {
            CredentialSecret::PasswordSecured(stored) => assert_eq!(stored, doc),
            other => panic!("unexpected secret: {:?}", other),
        }
    }

    #[test]
    fn test_raw_key_debug_redacted() {
        let key = KeyMaterial::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let printed = format!("{:?}", RawKey::from_key(&key));
        assert_eq!(printed, "RawKey(<redacted>)");
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let err = StoredCredential::from_bytes(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, VaultError::Serialization(_)));
    }
}
