//! The in-memory connection to an unlocked wallet.

use warden_core::Address;
use warden_perms::{unix_now, LocalSigner};

/// An unlocked wallet held by the coordinator.
///
/// Lives only in memory. Dropping it drops (and zeroizes) the key.
#[derive(Debug)]
pub struct ConnectionSession {
    signer: LocalSigner,
    connected_at: u64,
}

impl ConnectionSession {
    pub fn new(signer: LocalSigner) -> Self {
        Self {
            signer,
            connected_at: unix_now(),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.key().address()
    }

    pub fn signer(&self) -> &LocalSigner {
        &self.signer
    }

    /// Unix seconds at which the session was opened.
    pub fn connected_at(&self) -> u64 {
        self.connected_at
    }

    /// End the session, handing the signer to the caller.
    pub fn into_signer(self) -> LocalSigner {
        self.signer
    }
}
