//! Session permission requests.
//!
//! A [`PermissionRequest`] grants a session signer bounded authority over a
//! smart account: an allow-list of target contracts, a per-transaction
//! native token limit and a time window. Requests are built fresh for every
//! authorization attempt and never mutated after signing.

use std::fmt;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use warden_core::{Address, Amount};

use crate::error::{PermsError, Result};

/// A 32-byte unique request id. Prevents replay of a signed request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nonce(pub [u8; 32]);

impl Nonce {
    /// A fresh random nonce.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Which contracts a session signer may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSelection {
    /// Any contract.
    Wildcard,
    /// Only the listed contracts.
    Only(Vec<Address>),
}

impl TargetSelection {
    /// Encode as the on-chain list.
    ///
    /// `Wildcard` becomes `[Address::ZERO]`. Explicit lists are sorted and
    /// deduplicated; they may not be empty or contain the zero address.
    pub fn normalize(&self) -> Result<Vec<Address>> {
        match self {
            TargetSelection::Wildcard => Ok(vec![Address::ZERO]),
            TargetSelection::Only(targets) => {
                if targets.is_empty() {
                    return Err(PermsError::InvalidRequest(
                        "approved target list is empty".into(),
                    ));
                }
                if targets.iter().any(Address::is_zero) {
                    return Err(PermsError::InvalidRequest(
                        "zero address is reserved for the wildcard target".into(),
                    ));
                }
                let mut normalized = targets.clone();
                normalized.sort();
                normalized.dedup();
                Ok(normalized)
            }
        }
    }

    /// Decode an on-chain list.
    pub fn from_onchain(targets: &[Address]) -> Self {
        if is_wildcard(targets) {
            TargetSelection::Wildcard
        } else {
            TargetSelection::Only(targets.to_vec())
        }
    }
}

/// Whether an on-chain target list is the wildcard sentinel.
pub fn is_wildcard(targets: &[Address]) -> bool {
    !targets.is_empty() && targets.iter().all(Address::is_zero)
}

/// A half-open span of Unix seconds, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub start: u64,
    pub end: u64,
}

impl ValidityWindow {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// A window opening at `now` and lasting `duration`.
    pub fn starting_now(now: u64, duration: Duration) -> Self {
        Self {
            start: now,
            end: now.saturating_add(duration.as_secs()),
        }
    }

    pub fn contains(&self, t: u64) -> bool {
        self.start <= t && t < self.end
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.end <= self.start {
            return Err(PermsError::InvalidRequest(format!(
                "{} ends at {} but starts at {}",
                what, self.end, self.start
            )));
        }
        Ok(())
    }
}

/// What the caller wants a session signer to be allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPermissions {
    pub targets: TargetSelection,
    pub native_token_limit_per_transaction: Amount,
    /// When the granted permission is in force.
    pub permission_window: ValidityWindow,
    /// When the signed request itself may be submitted.
    pub request_validity: ValidityWindow,
}

impl SessionPermissions {
    /// Permissions whose request is valid for the same span as the grant.
    pub fn new(targets: TargetSelection, limit: Amount, permission_window: ValidityWindow) -> Self {
        Self {
            targets,
            native_token_limit_per_transaction: limit,
            permission_window,
            request_validity: permission_window,
        }
    }

    pub fn with_request_validity(mut self, window: ValidityWindow) -> Self {
        self.request_validity = window;
        self
    }
}

/// A normalized, signable permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    /// The session signer being granted authority.
    pub signer: Address,
    /// Normalized target list; `[ZERO]` means any target.
    pub approved_targets: Vec<Address>,
    pub native_token_limit_per_transaction: Amount,
    pub permission_window: ValidityWindow,
    pub request_validity: ValidityWindow,
    pub nonce: Nonce,
}

impl PermissionRequest {
    pub fn is_wildcard(&self) -> bool {
        is_wildcard(&self.approved_targets)
    }

    pub fn targets(&self) -> TargetSelection {
        TargetSelection::from_onchain(&self.approved_targets)
    }
}

/// Build a request for `signer` from caller permissions.
pub fn build_request(
    signer: Address,
    permissions: &SessionPermissions,
    nonce: Nonce,
) -> Result<PermissionRequest> {
    let approved_targets = permissions.targets.normalize()?;
    permissions.permission_window.check("permission window")?;
    permissions.request_validity.check("request validity window")?;

    Ok(PermissionRequest {
        signer,
        approved_targets,
        native_token_limit_per_transaction: permissions.native_token_limit_per_transaction,
        permission_window: permissions.permission_window,
        request_validity: permissions.request_validity,
        nonce,
    })
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn window() -> ValidityWindow {
        ValidityWindow::new(1_000, 2_000)
    }

    #[test]
    fn test_wildcard_encodes_as_zero() {
        let perms = SessionPermissions::new(TargetSelection::Wildcard, Amount::ZERO, window());
        let req = build_request(addr(9), &perms, Nonce::random()).unwrap();
        assert_eq!(req.approved_targets, vec![Address::ZERO]);
        assert!(req.is_wildcard());
        assert_eq!(req.targets(), TargetSelection::Wildcard);
    }

    #[test]
    fn test_explicit_targets_sorted_and_deduplicated() {
        let perms = SessionPermissions::new(
            TargetSelection::Only(vec![addr(0x22), addr(0x11), addr(0x22)]),
            Amount::from_ether(1),
            window(),
        );
        let req = build_request(addr(9), &perms, Nonce::random()).unwrap();
        assert_eq!(req.approved_targets, vec![addr(0x11), addr(0x22)]);
        assert!(!req.is_wildcard());
    }

    #[test]
    fn test_rejects_empty_targets() {
        let perms =
            SessionPermissions::new(TargetSelection::Only(vec![]), Amount::ZERO, window());
        let err = build_request(addr(9), &perms, Nonce::random()).unwrap_err();
        assert!(matches!(err, PermsError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_zero_in_explicit_list() {
        let perms = SessionPermissions::new(
            TargetSelection::Only(vec![addr(1), Address::ZERO]),
            Amount::ZERO,
            window(),
        );
        assert!(build_request(addr(9), &perms, Nonce::random()).is_err());
    }

    #[test]
    fn test_rejects_inverted_windows() {
        let perms = SessionPermissions::new(
            TargetSelection::Wildcard,
            Amount::ZERO,
            ValidityWindow::new(2_000, 2_000),
        );
        assert!(build_request(addr(9), &perms, Nonce::random()).is_err());

        let perms = SessionPermissions::new(TargetSelection::Wildcard, Amount::ZERO, window())
            .with_request_validity(ValidityWindow::new(5, 1));
        assert!(build_request(addr(9), &perms, Nonce::random()).is_err());
    }

    #[test]
    fn test_window_helpers() {
        let w = ValidityWindow::starting_now(100, Duration::from_secs(60));
        assert_eq!(w, ValidityWindow::new(100, 160));
        assert!(w.contains(100));
        assert!(w.contains(159));
        assert!(!w.contains(160));

        let saturated = ValidityWindow::starting_now(u64::MAX - 1, Duration::from_secs(60));
        assert_eq!(saturated.end, u64::MAX);
    }

    #[test]
    fn test_nonce_random_and_debug() {
        let a = Nonce::random();
        let b = Nonce::random();
        assert_ne!(a, b);
        assert_eq!(format!("{:?}", a).len(), "Nonce()".len() + 16);
    }
}
