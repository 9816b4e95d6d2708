//! EIP-712 typed-data digest for permission requests.
//!
//! The digest binds every request field to a domain (contract name and
//! version, chain id, verifying contract), so a signature cannot be
//! replayed against another account, chain or field set.

use serde::{Deserialize, Serialize};
use warden_core::{Address, Keccak256Hash};

use crate::request::PermissionRequest;

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const REQUEST_TYPE: &str = "SignerPermissionRequest(address signer,address[] approvedTargets,uint256 nativeTokenLimitPerTransaction,uint128 permissionStartTimestamp,uint128 permissionEndTimestamp,uint128 reqValidityStartTimestamp,uint128 reqValidityEndTimestamp,bytes32 uid)";

/// Signing domain of a smart account's permission contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl PermissionDomain {
    /// Domain of the stock smart account contract.
    pub fn account(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: "Account".to_string(),
            version: "1".to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// `hashStruct(EIP712Domain)`.
    pub fn separator(&self) -> Keccak256Hash {
        Keccak256Hash::hash_parts(&[
            &type_hash(DOMAIN_TYPE),
            Keccak256Hash::hash(self.name.as_bytes()).as_bytes(),
            Keccak256Hash::hash(self.version.as_bytes()).as_bytes(),
            &uint_word(u128::from(self.chain_id)),
            &address_word(&self.verifying_contract),
        ])
    }

    /// `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(request))`.
    pub fn signing_digest(&self, request: &PermissionRequest) -> Keccak256Hash {
        Keccak256Hash::hash_parts(&[
            &[0x19, 0x01],
            self.separator().as_bytes(),
            struct_hash(request).as_bytes(),
        ])
    }
}

/// `hashStruct(SignerPermissionRequest)`.
pub fn struct_hash(request: &PermissionRequest) -> Keccak256Hash {
    let targets: Vec<u8> = request
        .approved_targets
        .iter()
        .flat_map(address_word)
        .collect();

    Keccak256Hash::hash_parts(&[
        &type_hash(REQUEST_TYPE),
        &address_word(&request.signer),
        Keccak256Hash::hash(&targets).as_bytes(),
        &request.native_token_limit_per_transaction.to_be_word(),
        &uint_word(u128::from(request.permission_window.start)),
        &uint_word(u128::from(request.permission_window.end)),
        &uint_word(u128::from(request.request_validity.start)),
        &uint_word(u128::from(request.request_validity.end)),
        request.nonce.as_bytes(),
    ])
}

fn type_hash(ty: &str) -> [u8; 32] {
    Keccak256Hash::hash(ty.as_bytes()).0
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}
