//! Bring on-chain session permissions in line with what the caller wants.

use tracing::{debug, info};
use warden_core::Address;

use crate::chain::{ChainPermissions, TransactionReceipt};
use crate::error::Result;
use crate::policy::{decide, UpdateReason};
use crate::request::{build_request, Nonce, SessionPermissions};
use crate::signer::PermissionSigner;

/// Result of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// On-chain permissions already cover the request; nothing was sent.
    UpToDate,
    /// A signed request was written.
    Updated {
        reason: UpdateReason,
        receipt: TransactionReceipt,
    },
}

impl ReconcileOutcome {
    pub fn was_updated(&self) -> bool {
        matches!(self, ReconcileOutcome::Updated { .. })
    }
}

/// Reads, decides, signs and writes.
pub struct PermissionReconciler<C> {
    chain: C,
    signer: PermissionSigner,
}

impl<C: ChainPermissions> PermissionReconciler<C> {
    pub fn new(chain: C, signer: PermissionSigner) -> Self {
        Self { chain, signer }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn signer(&self) -> &PermissionSigner {
        &self.signer
    }

    pub fn signer_mut(&mut self) -> &mut PermissionSigner {
        &mut self.signer
    }

    /// Make `session_signer` hold `permissions`, writing only when the
    /// update policy requires it.
    ///
    /// The request is validated before anything is read. A failed or
    /// cancelled signature leaves the chain untouched, so the call can be
    /// retried with the same nonce.
    pub async fn reconcile(
        &self,
        session_signer: Address,
        permissions: &SessionPermissions,
        nonce: Nonce,
        now: u64,
    ) -> Result<ReconcileOutcome> {
        let request = build_request(session_signer, permissions, nonce)?;
        let current = self.chain.read(&session_signer).await?;

        let reason = match decide(&current, &request, now) {
            None => {
                debug!(session_signer = %session_signer, "permissions up to date");
                return Ok(ReconcileOutcome::UpToDate);
            }
            Some(reason) => reason,
        };

        info!(session_signer = %session_signer, %reason, "updating session permissions");
        let signed = self.signer.sign(&request).await?;
        let receipt = self.chain.write(&signed).await?;
        Ok(ReconcileOutcome::Updated { reason, receipt })
    }
}
