//! Coordinator states.

use std::fmt;

use warden_core::Address;

/// Why the coordinator could not settle or connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The vault backend could not be reached.
    StorageUnavailable(String),
    /// The saved credential could not be decoded or decrypted as a key.
    CorruptCredential(String),
    /// The saved key is not a valid secp256k1 scalar.
    InvalidKey,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::StorageUnavailable(ctx) => write!(f, "storage unavailable: {}", ctx),
            FailureReason::CorruptCredential(ctx) => write!(f, "corrupt credential: {}", ctx),
            FailureReason::InvalidKey => f.write_str("invalid key"),
        }
    }
}

/// Where the reconnect flow currently is.
///
/// `Connecting`, `Exporting`, `Importing` and `Removing` are transient:
/// every operation that enters one leaves it for a settled state, even
/// when the caller stops waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// The vault has not been queried yet.
    Uninitialized,
    /// A credential is saved under this id.
    HasSavedCredential(Address),
    NoSavedCredential,
    Connecting,
    /// Key material for this address is held in memory.
    Connected(Address),
    Failed(FailureReason),
    Exporting,
    Importing,
    Removing,
}

impl CoordinatorState {
    /// Whether no operation is in flight.
    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            CoordinatorState::Connecting
                | CoordinatorState::Exporting
                | CoordinatorState::Importing
                | CoordinatorState::Removing
        )
    }

    /// The credential this state refers to, if any.
    pub fn credential_id(&self) -> Option<Address> {
        match self {
            CoordinatorState::HasSavedCredential(id) | CoordinatorState::Connected(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, CoordinatorState::Connected(_))
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorState::Uninitialized => f.write_str("uninitialized"),
            CoordinatorState::HasSavedCredential(id) => write!(f, "has saved credential {}", id),
            CoordinatorState::NoSavedCredential => f.write_str("no saved credential"),
            CoordinatorState::Connecting => f.write_str("connecting"),
            CoordinatorState::Connected(id) => write!(f, "connected as {}", id),
            CoordinatorState::Failed(reason) => write!(f, "failed ({})", reason),
            CoordinatorState::Exporting => f.write_str("exporting"),
            CoordinatorState::Importing => f.write_str("importing"),
            CoordinatorState::Removing => f.write_str("removing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_and_ids() {
        let id = Address::from_bytes([7u8; 20]);
        assert!(CoordinatorState::Uninitialized.is_settled());
        assert!(CoordinatorState::Failed(FailureReason::InvalidKey).is_settled());
        assert!(!CoordinatorState::Connecting.is_settled());
        assert!(!CoordinatorState::Removing.is_settled());

        assert_eq!(CoordinatorState::Connected(id).credential_id(), Some(id));
        assert_eq!(CoordinatorState::HasSavedCredential(id).credential_id(), Some(id));
        assert_eq!(CoordinatorState::NoSavedCredential.credential_id(), None);
    }

    #[test]
    fn test_display() {
        let state = CoordinatorState::Failed(FailureReason::StorageUnavailable("quota".into()));
        assert_eq!(state.to_string(), "failed (storage unavailable: quota)");
    }
}
