//! Coordinator configuration.

use serde::{Deserialize, Serialize};
use warden_core::Address;
use warden_keystore::KdfConfig;

use crate::error::{Result, WardenError};

/// Configuration for a [`ReconnectCoordinator`](crate::ReconnectCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Prefix of every vault key.
    pub namespace: String,
    /// Credential to settle on. When unset, the oldest saved credential is used.
    pub expected_credential: Option<Address>,
    /// Label given to newly saved credentials.
    pub credential_name: String,
    /// KDF used when encrypting keys.
    pub kdf: KdfConfig,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            namespace: warden_vault::DEFAULT_NAMESPACE.to_string(),
            expected_credential: None,
            credential_name: "Wallet".to_string(),
            kdf: KdfConfig::standard(),
        }
    }
}

impl WardenConfig {
    /// Load from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| WardenError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(WardenError::Config("namespace is empty".into()));
        }
        self.kdf
            .validate()
            .map_err(|e| WardenError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WardenConfig::default();
        assert_eq!(config.namespace, "warden");
        assert_eq!(config.expected_credential, None);
        assert_eq!(config.kdf, KdfConfig::standard());
    }

    #[test]
    fn test_from_json_partial() {
        let config = WardenConfig::from_json(
            r#"{
                "namespace": "app",
                "expected_credential": "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
                "kdf": { "kdf": "pbkdf2", "c": 262144 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "app");
        assert_eq!(
            config.expected_credential.unwrap().to_hex(),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert_eq!(config.kdf, KdfConfig::pbkdf2(262_144));
        assert_eq!(config.credential_name, "Wallet");
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            WardenConfig::from_json(r#"{"kdf": {"kdf": "argon2"}}"#),
            Err(WardenError::Config(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_out_of_range_kdf() {
        for json in [
            r#"{"kdf": {"kdf": "scrypt", "log_n": 64, "r": 8, "p": 1}}"#,
            r#"{"kdf": {"kdf": "scrypt", "log_n": 0, "r": 8, "p": 1}}"#,
            r#"{"kdf": {"kdf": "scrypt", "log_n": 18, "r": 0, "p": 1}}"#,
            r#"{"kdf": {"kdf": "pbkdf2", "c": 4000000000}}"#,
            r#"{"namespace": ""}"#,
        ] {
            assert!(
                matches!(WardenConfig::from_json(json), Err(WardenError::Config(_))),
                "{}",
                json
            );
        }
    }
}
