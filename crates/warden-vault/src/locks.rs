//! Per-credential async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use warden_core::Address;

/// One async mutex per credential id.
///
/// Operations on the same id run one at a time; operations on different
/// ids never wait on each other. Idle entries are pruned on the next call.
#[derive(Default)]
pub struct IdLocks {
    locks: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn lock(&self, id: &Address) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks.entry(*id).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Number of ids currently held or awaited.
    pub fn active(&self) -> usize {
        let locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}
