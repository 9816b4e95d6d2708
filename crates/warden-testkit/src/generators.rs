//! Proptest generators for property-based testing.

use proptest::prelude::*;

use warden_core::{Address, Amount, KeyMaterial};
use warden_perms::{
    Nonce, PermissionRequest, PermissionState, RemotePermissions, SessionPermissions,
    TargetSelection, ValidityWindow,
};

/// Generate a random key.
pub fn key_material() -> impl Strategy<Value = KeyMaterial> {
    any::<[u8; 32]>().prop_filter_map("not a valid scalar", |bytes| {
        KeyMaterial::from_private_key(&bytes).ok()
    })
}

/// Generate any address, including zero.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a non-zero address.
pub fn contract_address() -> impl Strategy<Value = Address> {
    address().prop_filter("zero address", |a| !a.is_zero())
}

/// Generate an amount up to 1000 ether.
pub fn amount() -> impl Strategy<Value = Amount> {
    (0u128..=1_000 * Amount::WEI_PER_ETHER).prop_map(Amount::from_wei)
}

pub fn nonce() -> impl Strategy<Value = Nonce> {
    any::<[u8; 32]>().prop_map(Nonce::from_bytes)
}

/// Generate a non-empty window inside a plausible range of Unix seconds.
pub fn validity_window() -> impl Strategy<Value = ValidityWindow> {
    (0u64..=4_000_000_000, 1u64..=365 * 86_400)
        .prop_map(|(start, len)| ValidityWindow::new(start, start + len))
}

/// Generate a target selection: wildcard or up to eight contracts.
pub fn target_selection() -> impl Strategy<Value = TargetSelection> {
    prop_oneof![
        1 => Just(TargetSelection::Wildcard),
        4 => prop::collection::vec(contract_address(), 1..=8).prop_map(TargetSelection::Only),
    ]
}

pub fn session_permissions() -> impl Strategy<Value = SessionPermissions> {
    (target_selection(), amount(), validity_window())
        .prop_map(|(targets, limit, window)| SessionPermissions::new(targets, limit, window))
}

/// Generate a well-formed request.
pub fn permission_request() -> impl Strategy<Value = PermissionRequest> {
    (contract_address(), session_permissions(), nonce()).prop_filter_map(
        "invalid permissions",
        |(signer, perms, nonce)| warden_perms::build_request(signer, &perms, nonce).ok(),
    )
}

/// Generate an arbitrary on-chain state, sometimes expired or empty.
pub fn permission_state() -> impl Strategy<Value = PermissionState> {
    (
        prop::collection::vec(address(), 0..=4),
        amount(),
        0u64..=4_000_000_000,
        0u64..=4_000_000_000,
    )
        .prop_map(|(approved_targets, limit, start, end)| PermissionState {
            approved_targets,
            native_token_limit_per_transaction: limit,
            start_timestamp: start,
            end_timestamp: end,
        })
}

pub fn remote_permissions() -> impl Strategy<Value = RemotePermissions> {
    prop_oneof![
        1 => Just(RemotePermissions::AccountNotDeployed),
        4 => permission_state().prop_map(RemotePermissions::Deployed),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_perms::{decide, should_update, UpdateReason};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_requests_are_normalized(req in permission_request()) {
            let mut sorted = req.approved_targets.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(&sorted, &req.approved_targets);
            prop_assert!(!req.approved_targets.is_empty());
        }

        #[test]
        fn test_own_state_needs_no_update(req in permission_request()) {
            let state = RemotePermissions::Deployed(PermissionState::from_request(&req));
            let now = req.permission_window.start;
            prop_assert!(!should_update(&state, &req, now));
        }

        #[test]
        fn test_undeployed_always_updates(req in permission_request(), now in any::<u64>()) {
            prop_assert_eq!(
                decide(&RemotePermissions::AccountNotDeployed, &req, now),
                Some(UpdateReason::AccountNotDeployed)
            );
        }

        #[test]
        fn test_decision_matches_should_update(
            current in remote_permissions(),
            req in permission_request(),
            now in 0u64..=4_000_000_000,
        ) {
            prop_assert_eq!(decide(&current, &req, now).is_some(), should_update(&current, &req, now));
        }
    }
}
