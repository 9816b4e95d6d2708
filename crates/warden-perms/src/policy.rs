//! Whether a permission request needs an on-chain update.
//!
//! The rules are evaluated in order and the first match wins:
//!
//! 1. the account is not deployed yet
//! 2. the current permission has expired
//! 3. the approved target sets differ
//! 4. the requested per-transaction limit is higher than the current one
//!
//! A request to lower the limit does not by itself trigger an update. The
//! previously granted, higher limit stays in force on-chain.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use warden_core::{Address, Amount};

use crate::request::PermissionRequest;

/// Permissions currently recorded on-chain for one session signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionState {
    pub approved_targets: Vec<Address>,
    pub native_token_limit_per_transaction: Amount,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
}

impl PermissionState {
    /// A signer with no permissions at all.
    pub fn none() -> Self {
        Self {
            approved_targets: Vec::new(),
            native_token_limit_per_transaction: Amount::ZERO,
            start_timestamp: 0,
            end_timestamp: 0,
        }
    }

    /// The state a successful write of `request` produces.
    pub fn from_request(request: &PermissionRequest) -> Self {
        Self {
            approved_targets: request.approved_targets.clone(),
            native_token_limit_per_transaction: request.native_token_limit_per_transaction,
            start_timestamp: request.permission_window.start,
            end_timestamp: request.permission_window.end,
        }
    }
}

/// The remote view of a session signer's permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemotePermissions {
    /// The smart account has not been deployed; no state exists.
    AccountNotDeployed,
    Deployed(PermissionState),
}

/// Why an update is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    AccountNotDeployed,
    Expired,
    TargetsChanged,
    LimitRaised,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateReason::AccountNotDeployed => "account not deployed",
            UpdateReason::Expired => "current permission expired",
            UpdateReason::TargetsChanged => "approved targets changed",
            UpdateReason::LimitRaised => "native token limit raised",
        };
        f.write_str(s)
    }
}

/// The first rule that requires an update, if any.
pub fn decide(
    current: &RemotePermissions,
    requested: &PermissionRequest,
    now: u64,
) -> Option<UpdateReason> {
    let state = match current {
        RemotePermissions::AccountNotDeployed => return Some(UpdateReason::AccountNotDeployed),
        RemotePermissions::Deployed(state) => state,
    };

    if state.end_timestamp < now {
        return Some(UpdateReason::Expired);
    }

    if !same_targets(&state.approved_targets, &requested.approved_targets) {
        return Some(UpdateReason::TargetsChanged);
    }

    if requested.native_token_limit_per_transaction > state.native_token_limit_per_transaction {
        return Some(UpdateReason::LimitRaised);
    }

    None
}

/// Whether `requested` must be written on-chain before it is in force.
pub fn should_update(current: &RemotePermissions, requested: &PermissionRequest, now: u64) -> bool {
    decide(current, requested, now).is_some()
}

/// Set equality. The wildcard is `[ZERO]` on both sides, so it only
/// matches itself.
fn same_targets(current: &[Address], requested: &[Address]) -> bool {
    let current: BTreeSet<&Address> = current.iter().collect();
    let requested: BTreeSet<&Address> = requested.iter().collect();
    current == requested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{build_request, Nonce, SessionPermissions, TargetSelection, ValidityWindow};
    use proptest::prelude::*;

    const NOW: u64 = 1_700_000_000;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn request(targets: TargetSelection, limit: Amount) -> PermissionRequest {
        let perms = SessionPermissions::new(
            targets,
            limit,
            ValidityWindow::new(NOW - 10, NOW + 3_600),
        );
        build_request(addr(0xee), &perms, Nonce::from_bytes([7u8; 32])).unwrap()
    }

    fn remote(targets: Vec<Address>, limit: Amount, end: u64) -> RemotePermissions {
        RemotePermissions::Deployed(PermissionState {
            approved_targets: targets,
            native_token_limit_per_transaction: limit,
            start_timestamp: NOW - 100,
            end_timestamp: end,
        })
    }

    #[test]
    fn test_not_deployed_always_updates() {
        let req = request(TargetSelection::Wildcard, Amount::ZERO);
        assert_eq!(
            decide(&RemotePermissions::AccountNotDeployed, &req, NOW),
            Some(UpdateReason::AccountNotDeployed)
        );
    }

    #[test]
    fn test_expired_always_updates() {
        let req = request(TargetSelection::Only(vec![addr(1)]), Amount::from_ether(1));
        let current = remote(vec![addr(1)], Amount::from_ether(1), NOW - 1);
        assert_eq!(decide(&current, &req, NOW), Some(UpdateReason::Expired));
    }

    #[test]
    fn test_end_equal_to_now_is_not_expired() {
        let req = request(TargetSelection::Only(vec![addr(1)]), Amount::from_ether(1));
        let current = remote(vec![addr(1)], Amount::from_ether(1), NOW);
        assert!(!should_update(&current, &req, NOW));
    }

    #[test]
    fn test_wildcard_matches_zero_sentinel() {
        let req = request(TargetSelection::Wildcard, Amount::from_ether(1));
        let current = remote(vec![Address::ZERO], Amount::from_ether(1), NOW + 60);
        assert!(!should_update(&current, &req, NOW));
    }

    #[test]
    fn test_wildcard_does_not_match_explicit_list() {
        let req = request(TargetSelection::Wildcard, Amount::from_ether(1));
        let current = remote(vec![addr(1)], Amount::from_ether(1), NOW + 60);
        assert_eq!(decide(&current, &req, NOW), Some(UpdateReason::TargetsChanged));

        let req = request(TargetSelection::Only(vec![addr(1)]), Amount::from_ether(1));
        let current = remote(vec![Address::ZERO], Amount::from_ether(1), NOW + 60);
        assert_eq!(decide(&current, &req, NOW), Some(UpdateReason::TargetsChanged));
    }

    #[test]
    fn test_target_order_is_irrelevant() {
        let req = request(
            TargetSelection::Only(vec![addr(1), addr(2)]),
            Amount::from_ether(1),
        );
        let current = remote(vec![addr(2), addr(1)], Amount::from_ether(1), NOW + 60);
        assert!(!should_update(&current, &req, NOW));
    }

    #[test]
    fn test_limit_increase_forces_update() {
        let one = Amount::from_ether(1);
        let two = Amount::from_ether(2);
        let req = request(TargetSelection::Only(vec![addr(1)]), two);
        let current = remote(vec![addr(1)], one, NOW + 60);
        assert_eq!(decide(&current, &req, NOW), Some(UpdateReason::LimitRaised));
    }

    #[test]
    fn test_limit_decrease_does_not_force_update() {
        let one = Amount::from_ether(1);
        let half = Amount::from_wei(one.as_wei() / 2);
        let req = request(TargetSelection::Only(vec![addr(1)]), half);
        let current = remote(vec![addr(1)], one, NOW + 60);
        assert_eq!(decide(&current, &req, NOW), None);
    }

    #[test]
    fn test_rules_apply_in_order() {
        // Expired and different targets: expiry reported first.
        let req = request(TargetSelection::Only(vec![addr(1)]), Amount::from_ether(5));
        let current = remote(vec![addr(2)], Amount::ZERO, NOW - 1);
        assert_eq!(decide(&current, &req, NOW), Some(UpdateReason::Expired));

        // Different targets and raised limit: targets reported first.
        let current = remote(vec![addr(2)], Amount::ZERO, NOW + 60);
        assert_eq!(decide(&current, &req, NOW), Some(UpdateReason::TargetsChanged));
    }

    #[test]
    fn test_unset_signer_state_updates() {
        let req = request(TargetSelection::Wildcard, Amount::ZERO);
        let current = RemotePermissions::Deployed(PermissionState::none());
        assert!(should_update(&current, &req, NOW));
    }

    proptest! {
        #[test]
        fn prop_expired_updates_regardless(
            targets in prop::collection::vec(any::<[u8; 20]>(), 0..4),
            limit in any::<u128>(),
            requested in any::<u128>(),
            age in 1u64..1_000_000,
        ) {
            let current = remote(
                targets.into_iter().map(Address::from_bytes).collect(),
                Amount::from_wei(limit),
                NOW - age,
            );
            let req = request(TargetSelection::Wildcard, Amount::from_wei(requested));
            prop_assert!(should_update(&current, &req, NOW));
        }

        #[test]
        fn prop_identical_state_never_updates(
            targets in prop::collection::btree_set(1u8..=255, 1..5),
            limit in any::<u128>(),
        ) {
            let targets: Vec<Address> = targets.into_iter().map(addr).collect();
            let req = request(TargetSelection::Only(targets), Amount::from_wei(limit));
            let current = RemotePermissions::Deployed(PermissionState::from_request(&req));
            prop_assert!(!should_update(&current, &req, NOW));
        }
    }
}
