//! Password key derivation.
//!
//! Two KDFs are understood: `scrypt` and `pbkdf2` with `hmac-sha256`.
//! Parameters always travel inside the document so decryption can replay
//! them exactly.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::document::hex_bytes;
use crate::error::{KeystoreError, Result};
use crate::romix;

/// Derived key length written by this codec.
pub const DEFAULT_DKLEN: u32 = 32;

/// Salt length written by this codec.
pub const SALT_LEN: usize = 32;

/// Upper bound on `dklen` accepted from foreign documents.
const MAX_DKLEN: u32 = 1024;

/// Largest scrypt cost exponent accepted (n = 2^20).
pub const MAX_SCRYPT_LOG_N: u8 = 20;

/// Upper bound on scrypt's `128 * r * n` working set.
const MAX_SCRYPT_MEMORY: u64 = 1 << 30;

/// Upper bound on scrypt's `n * r * p` block mixes.
const MAX_SCRYPT_WORK: u64 = 1 << 26;

/// Upper bound on pbkdf2 iterations.
pub const MAX_PBKDF2_ROUNDS: u32 = 10_000_000;

/// Which KDF, and how hard, to use when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kdf", rename_all = "lowercase")]
pub enum KdfConfig {
    /// scrypt with `n = 2^log_n`.
    Scrypt { log_n: u8, r: u32, p: u32 },
    /// PBKDF2-HMAC-SHA256 with `c` iterations.
    Pbkdf2 { c: u32 },
}

impl KdfConfig {
    /// geth's "standard" scrypt parameters (n = 2^18, r = 8, p = 1).
    pub const fn standard() -> Self {
        KdfConfig::Scrypt {
            log_n: 18,
            r: 8,
            p: 1,
        }
    }

    /// geth's "light" scrypt parameters (n = 2^12, r = 8, p = 6).
    pub const fn light() -> Self {
        KdfConfig::Scrypt {
            log_n: 12,
            r: 8,
            p: 6,
        }
    }

    pub const fn scrypt(log_n: u8, r: u32, p: u32) -> Self {
        KdfConfig::Scrypt { log_n, r, p }
    }

    pub const fn pbkdf2(c: u32) -> Self {
        KdfConfig::Pbkdf2 { c }
    }

    /// Check the settings without deriving anything.
    pub fn validate(&self) -> Result<()> {
        self.with_salt(Vec::new()).map(|_| ())
    }

    /// Build concrete parameters with a fresh random salt.
    pub fn fresh_params(&self) -> Result<KdfParams> {
        let mut salt = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        self.with_salt(salt)
    }

    fn with_salt(&self, salt: Vec<u8>) -> Result<KdfParams> {
        let params = match *self {
            KdfConfig::Scrypt { log_n, r, p } => {
                if log_n == 0 || log_n > MAX_SCRYPT_LOG_N {
                    return Err(KeystoreError::InvalidKdfConfig(format!(
                        "scrypt log_n must be in 1..={}, got {}",
                        MAX_SCRYPT_LOG_N, log_n
                    )));
                }
                KdfParams::Scrypt(ScryptParams {
                    dklen: DEFAULT_DKLEN,
                    n: 1u64 << log_n,
                    p,
                    r,
                    salt,
                })
            }
            KdfConfig::Pbkdf2 { c } => KdfParams::Pbkdf2(Pbkdf2Params {
                c,
                dklen: DEFAULT_DKLEN,
                prf: PBKDF2_PRF.to_string(),
                salt,
            }),
        };
        params.check().map_err(KeystoreError::InvalidKdfConfig)?;
        Ok(params)
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self::standard()
    }
}

const PBKDF2_PRF: &str = "hmac-sha256";

/// `kdfparams` for scrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryptParams {
    pub dklen: u32,
    pub n: u64,
    pub p: u32,
    pub r: u32,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
}

/// `kdfparams` for pbkdf2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    pub c: u32,
    pub dklen: u32,
    pub prf: String,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
}

/// Concrete, replayable KDF parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfParams {
    Scrypt(ScryptParams),
    Pbkdf2(Pbkdf2Params),
}

impl KdfParams {
    /// Parse `kdf` + `kdfparams` from a document.
    pub fn parse(kdf: &str, params: &serde_json::Value) -> Result<Self> {
        let corrupt = |e: serde_json::Error| KeystoreError::CorruptKeystore(e.to_string());
        let parsed = match kdf {
            "scrypt" => KdfParams::Scrypt(serde_json::from_value(params.clone()).map_err(corrupt)?),
            "pbkdf2" => KdfParams::Pbkdf2(serde_json::from_value(params.clone()).map_err(corrupt)?),
            other => {
                return Err(KeystoreError::CorruptKeystore(format!(
                    "unsupported kdf: {}",
                    other
                )))
            }
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// The document name of this KDF.
    pub fn name(&self) -> &'static str {
        match self {
            KdfParams::Scrypt(_) => "scrypt",
            KdfParams::Pbkdf2(_) => "pbkdf2",
        }
    }

    /// Encode as the document's `kdfparams` object.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            KdfParams::Scrypt(p) => serde_json::to_value(p),
            KdfParams::Pbkdf2(p) => serde_json::to_value(p),
        };
        value.map_err(|e| KeystoreError::CorruptKeystore(e.to_string()))
    }

    pub fn dklen(&self) -> u32 {
        match self {
            KdfParams::Scrypt(p) => p.dklen,
            KdfParams::Pbkdf2(p) => p.dklen,
        }
    }

    fn validate(&self) -> Result<()> {
        self.check().map_err(KeystoreError::CorruptKeystore)
    }

    /// Range checks shared by parsed documents and configured settings.
    /// Runs before any buffer is sized from the parameters.
    fn check(&self) -> std::result::Result<(), String> {
        let dklen = self.dklen();
        if !(32..=MAX_DKLEN).contains(&dklen) {
            return Err(format!("dklen out of range: {}", dklen));
        }
        match self {
            KdfParams::Scrypt(p) => {
                if p.n < 2 || !p.n.is_power_of_two() {
                    return Err("scrypt n must be a power of two".into());
                }
                if p.n > 1 << MAX_SCRYPT_LOG_N {
                    return Err(format!("scrypt n too large: {}", p.n));
                }
                if p.r == 0 || p.p == 0 {
                    return Err("scrypt r and p must be non-zero".into());
                }
                let (n, r, par) = (p.n as u128, p.r as u128, p.p as u128);
                if 128 * r * n > MAX_SCRYPT_MEMORY as u128 {
                    return Err(format!("scrypt memory too large: r = {}, n = {}", p.r, p.n));
                }
                if n * r * par > MAX_SCRYPT_WORK as u128 {
                    return Err(format!(
                        "scrypt cost too large: n = {}, r = {}, p = {}",
                        p.n, p.r, p.p
                    ));
                }
                Ok(())
            }
            KdfParams::Pbkdf2(p) => {
                if p.prf != PBKDF2_PRF {
                    return Err(format!("unsupported prf: {}", p.prf));
                }
                if p.c == 0 {
                    return Err("pbkdf2 iteration count is zero".into());
                }
                if p.c > MAX_PBKDF2_ROUNDS {
                    return Err(format!("pbkdf2 iteration count too large: {}", p.c));
                }
                Ok(())
            }
        }
    }

    /// Run the KDF. CPU- and memory-bound; call from a blocking context.
    pub fn derive(&self, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.validate()?;
        let mut out = Zeroizing::new(vec![0u8; self.dklen() as usize]);
        match self {
            KdfParams::Scrypt(p) => {
                let log_n = p.n.trailing_zeros() as u8;
                if (log_n as u32) < 16 * p.r {
                    // Output length comes from the buffer; `len` only feeds the PHC encoder.
                    let params = scrypt::Params::new(log_n, p.r, p.p, DEFAULT_DKLEN as usize)
                        .map_err(|e| {
                            KeystoreError::CorruptKeystore(format!("scrypt params: {}", e))
                        })?;
                    scrypt::scrypt(password, &p.salt, &params, &mut out)
                        .map_err(|e| KeystoreError::CorruptKeystore(format!("scrypt: {}", e)))?;
                } else {
                    // Small r with large n (geth writes r = 1, n = 2^18).
                    let (n, r, par) = (p.n as usize, p.r as usize, p.p as usize);
                    romix::scrypt(password, &p.salt, n, r, par, &mut out);
                }
            }
            KdfParams::Pbkdf2(p) => {
                pbkdf2_hmac::<Sha256>(password, &p.salt, p.c, &mut out);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_params_have_new_salts() {
        let config = KdfConfig::scrypt(4, 8, 1);
        let a = config.fresh_params().unwrap();
        let b = config.fresh_params().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.name(), "scrypt");
    }

    #[test]
    fn test_params_value_roundtrip() {
        let params = KdfConfig::pbkdf2(1000).fresh_params().unwrap();
        let value = params.to_value().unwrap();
        assert_eq!(value["prf"], "hmac-sha256");
        let parsed = KdfParams::parse("pbkdf2", &value).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let params = KdfConfig::scrypt(4, 8, 1).fresh_params().unwrap();
        let k1 = params.derive(b"pw").unwrap();
        let k2 = params.derive(b"pw").unwrap();
        let k3 = params.derive(b"other").unwrap();
        assert_eq!(*k1, *k2);
        assert_ne!(*k1, *k3);
        assert_eq!(k1.len(), 32);
    }

    #[test]
    fn test_pbkdf2_rfc7914_vector() {
        // RFC 7914 section 11: PBKDF2-HMAC-SHA256("passwd", "salt", 1, 64).
        let params = KdfParams::Pbkdf2(Pbkdf2Params {
            c: 1,
            dklen: 64,
            prf: "hmac-sha256".into(),
            salt: b"salt".to_vec(),
        });
        let out = params.derive(b"passwd").unwrap();
        assert_eq!(
            hex::encode(&out[..16]),
            "55ac046e56e3089fec1691c22544b605"
        );
    }

    #[test]
    fn test_rejects_unknown_or_malformed() {
        let value = serde_json::json!({ "n": 3, "r": 8, "p": 1, "dklen": 32, "salt": "00" });
        assert!(KdfParams::parse("scrypt", &value).unwrap_err().is_corrupt());

        let value = serde_json::json!({ "c": 10, "dklen": 32, "prf": "hmac-sha512", "salt": "00" });
        assert!(KdfParams::parse("pbkdf2", &value).unwrap_err().is_corrupt());

        let value = serde_json::json!({});
        assert!(KdfParams::parse("argon2", &value).unwrap_err().is_corrupt());

        let value = serde_json::json!({ "c": 10, "dklen": 16, "prf": "hmac-sha256", "salt": "00" });
        assert!(KdfParams::parse("pbkdf2", &value).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_rejects_oversized_params_before_deriving() {
        let salt = "00";
        for (n, r, p) in [
            (1u64 << 40, 8u32, 1u32),
            (1 << 21, 1, 1),
            (1 << 20, 16, 1),
            (1 << 18, 8, 1000),
            (1 << 10, 0, 1),
            (1 << 10, 8, 0),
        ] {
            let value = serde_json::json!({ "dklen": 32, "n": n, "p": p, "r": r, "salt": salt });
            let err = KdfParams::parse("scrypt", &value).unwrap_err();
            assert!(err.is_corrupt(), "n = {}, r = {}, p = {}", n, r, p);
        }

        let value = serde_json::json!({ "c": u32::MAX, "dklen": 32, "prf": "hmac-sha256", "salt": salt });
        assert!(KdfParams::parse("pbkdf2", &value).unwrap_err().is_corrupt());

        // Hand-built parameters are checked again at derive time.
        let params = KdfParams::Scrypt(ScryptParams {
            dklen: 32,
            n: 1 << 40,
            p: 1,
            r: 8,
            salt: vec![0],
        });
        assert!(params.derive(b"pw").unwrap_err().is_corrupt());
    }

    #[test]
    fn test_accepts_geth_parameter_sets() {
        for (n, r, p) in [(1u64 << 18, 8u32, 1u32), (1 << 12, 8, 6), (1 << 18, 1, 8)] {
            let value = serde_json::json!({ "dklen": 32, "n": n, "p": p, "r": r, "salt": "00" });
            assert!(KdfParams::parse("scrypt", &value).is_ok(), "n = {}, r = {}, p = {}", n, r, p);
        }
        let value = serde_json::json!({ "c": 262144, "dklen": 32, "prf": "hmac-sha256", "salt": "00" });
        assert!(KdfParams::parse("pbkdf2", &value).is_ok());
    }

    #[test]
    fn test_config_validate() {
        assert!(KdfConfig::standard().validate().is_ok());
        assert!(KdfConfig::light().validate().is_ok());
        assert!(KdfConfig::pbkdf2(262_144).validate().is_ok());

        for config in [
            KdfConfig::scrypt(0, 8, 1),
            KdfConfig::scrypt(64, 8, 1),
            KdfConfig::scrypt(200, 8, 1),
            KdfConfig::scrypt(10, 0, 1),
            KdfConfig::pbkdf2(0),
            KdfConfig::pbkdf2(MAX_PBKDF2_ROUNDS + 1),
        ] {
            assert!(
                matches!(config.validate(), Err(KeystoreError::InvalidKdfConfig(_))),
                "{:?}",
                config
            );
            assert!(config.fresh_params().is_err());
        }
    }

    #[test]
    fn test_small_r_large_n_derives() {
        let params = KdfParams::Scrypt(ScryptParams {
            dklen: 32,
            n: 1 << 16,
            p: 1,
            r: 1,
            salt: b"salt".to_vec(),
        });
        let key = params.derive(b"pw").unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(*key, *params.derive(b"pw").unwrap());
    }

    #[test]
    fn test_config_serde_tagged() {
        let json = serde_json::to_string(&KdfConfig::light()).unwrap();
        assert_eq!(json, r#"{"kdf":"scrypt","log_n":12,"r":8,"p":6}"#);
        let back: KdfConfig = serde_json::from_str(r#"{"kdf":"pbkdf2","c":4096}"#).unwrap();
        assert_eq!(back, KdfConfig::pbkdf2(4096));
    }
}
