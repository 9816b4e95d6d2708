//! Signers and permission signing.
//!
//! [`Signer`] is the one capability every wallet flavour exposes. Variants
//! are independent types composed by the caller:
//!
//! - [`LocalSigner`] signs with key material held in-process
//! - [`InteractiveSigner`] forwards each digest to an external wallet and
//!   waits for the user to approve or reject it
//!
//! [`PermissionSigner`] turns a [`PermissionRequest`] into its typed-data
//! digest and asks the attached signer to sign it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use warden_core::{Address, KeyMaterial, Signature};

use crate::error::{PermsError, Result};
use crate::request::PermissionRequest;
use crate::typed_data::PermissionDomain;

/// Anything that can sign a 32-byte digest for one address.
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Local
// ─────────────────────────────────────────────────────────────────────────────

/// Signs with in-process key material. Owns the key.
pub struct LocalSigner {
    key: KeyMaterial,
}

impl LocalSigner {
    pub fn new(key: KeyMaterial) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Give the key back, ending this signer.
    pub fn into_key(self) -> KeyMaterial {
        self.key
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.key.address())
            .finish()
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.key.address()
    }

    async fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        Ok(self.key.sign_digest(digest)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interactive
// ─────────────────────────────────────────────────────────────────────────────

/// A digest awaiting the user's decision in an external wallet.
///
/// Dropping it without answering counts as a rejection.
pub struct SignatureRequest {
    pub address: Address,
    pub digest: [u8; 32],
    responder: oneshot::Sender<Option<Signature>>,
}

impl SignatureRequest {
    /// Answer with a signature. Returns `false` if the requester stopped waiting.
    pub fn approve(self, signature: Signature) -> bool {
        self.responder.send(Some(signature)).is_ok()
    }

    /// Decline to sign.
    pub fn reject(self) {
        let _ = self.responder.send(None);
    }

    /// Whether the requester has stopped waiting.
    pub fn is_cancelled(&self) -> bool {
        self.responder.is_closed()
    }
}

impl fmt::Debug for SignatureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureRequest")
            .field("address", &self.address)
            .field("digest", &hex::encode(&self.digest[..8]))
            .finish()
    }
}

/// Forwards signing to an external wallet over a channel.
#[derive(Clone)]
pub struct InteractiveSigner {
    address: Address,
    requests: mpsc::Sender<SignatureRequest>,
}

impl InteractiveSigner {
    /// Create a signer for `address` and the receiving end the wallet listens on.
    pub fn channel(address: Address, buffer: usize) -> (Self, mpsc::Receiver<SignatureRequest>) {
        let (requests, rx) = mpsc::channel(buffer.max(1));
        (Self { address, requests }, rx)
    }
}

#[async_trait]
impl Signer for InteractiveSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        let (responder, response) = oneshot::channel();
        let request = SignatureRequest {
            address: self.address,
            digest: *digest,
            responder,
        };
        self.requests
            .send(request)
            .await
            .map_err(|_| PermsError::SigningUnavailable)?;

        let signature = match response.await {
            Ok(Some(signature)) => signature,
            Ok(None) | Err(_) => return Err(PermsError::UserRejectedSignature),
        };

        if signature.recover_address(digest)? != self.address {
            return Err(PermsError::Core(warden_core::CoreError::InvalidSignature));
        }
        Ok(signature)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission signing
// ─────────────────────────────────────────────────────────────────────────────

/// A permission request with the account admin's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPermissionRequest {
    pub request: PermissionRequest,
    pub signature: Signature,
}

impl SignedPermissionRequest {
    /// The address that produced the signature under `domain`.
    pub fn recover_signer(&self, domain: &PermissionDomain) -> Result<Address> {
        let digest = domain.signing_digest(&self.request);
        Ok(self.signature.recover_address(digest.as_bytes())?)
    }
}

/// Signs permission requests for one domain.
#[derive(Clone)]
pub struct PermissionSigner {
    domain: PermissionDomain,
    signer: Option<Arc<dyn Signer>>,
}

impl PermissionSigner {
    /// A permission signer with no signer attached.
    pub fn new(domain: PermissionDomain) -> Self {
        Self {
            domain,
            signer: None,
        }
    }

    pub fn domain(&self) -> &PermissionDomain {
        &self.domain
    }

    pub fn attach(&mut self, signer: Arc<dyn Signer>) {
        self.signer = Some(signer);
    }

    pub fn detach(&mut self) -> Option<Arc<dyn Signer>> {
        self.signer.take()
    }

    /// Address of the attached signer, if any.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Sign with the attached signer.
    ///
    /// Dropping the returned future cancels the request; `request` is not
    /// consumed and may be signed again with the same nonce.
    pub async fn sign(&self, request: &PermissionRequest) -> Result<SignedPermissionRequest> {
        let signer = self.signer.as_ref().ok_or(PermsError::SigningUnavailable)?;
        self.sign_with(request, &**signer).await
    }

    /// Sign with an explicit signer.
    pub async fn sign_with(
        &self,
        request: &PermissionRequest,
        signer: &dyn Signer,
    ) -> Result<SignedPermissionRequest> {
        let digest = self.domain.signing_digest(request);
        debug!(
            admin = %signer.address(),
            session_signer = %request.signer,
            nonce = %request.nonce,
            "signing permission request"
        );
        let signature = signer.sign_digest(digest.as_bytes()).await?;
        Ok(SignedPermissionRequest {
            request: request.clone(),
            signature,
        })
    }
}

impl fmt::Debug for PermissionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionSigner")
            .field("domain", &self.domain)
            .field("signer", &self.signer_address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{build_request, Nonce, SessionPermissions, TargetSelection, ValidityWindow};
    use std::time::Duration;
    use warden_core::Amount;

    fn domain() -> PermissionDomain {
        PermissionDomain::account(1, Address::from_bytes([0x42; 20]))
    }

    fn request() -> PermissionRequest {
        let perms = SessionPermissions::new(
            TargetSelection::Only(vec![
                Address::from_bytes([0x11; 20]),
                Address::from_bytes([0x22; 20]),
            ]),
            Amount::from_ether(1),
            ValidityWindow::new(1_000, 2_000),
        );
        build_request(Address::from_bytes([0xee; 20]), &perms, Nonce::from_bytes([9u8; 32]))
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_sign_recovers_admin() {
        let key = KeyMaterial::generate();
        let admin = key.address();
        let mut signer = PermissionSigner::new(domain());
        signer.attach(Arc::new(LocalSigner::new(key)));

        let signed = signer.sign(&request()).await.unwrap();
        assert_eq!(signed.recover_signer(&domain()).unwrap(), admin);
        assert_eq!(signed.request, request());

        let other_domain = PermissionDomain::account(5, Address::from_bytes([0x42; 20]));
        assert_ne!(signed.recover_signer(&other_domain).unwrap(), admin);
    }

    #[tokio::test]
    async fn test_no_signer_attached() {
        let signer = PermissionSigner::new(domain());
        assert_eq!(
            signer.sign(&request()).await.unwrap_err(),
            PermsError::SigningUnavailable
        );
    }

    #[tokio::test]
    async fn test_detach() {
        let mut signer = PermissionSigner::new(domain());
        signer.attach(Arc::new(LocalSigner::new(KeyMaterial::generate())));
        assert!(signer.detach().is_some());
        assert!(signer.signer_address().is_none());
        assert!(signer.sign(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_interactive_approve() {
        let wallet_key = KeyMaterial::generate();
        let (interactive, mut requests) = InteractiveSigner::channel(wallet_key.address(), 4);
        let wallet = tokio::spawn(async move {
            let req = requests.recv().await.unwrap();
            let sig = wallet_key.sign_digest(&req.digest).unwrap();
            assert!(req.approve(sig));
        });

        let admin = interactive.address();
        let mut signer = PermissionSigner::new(domain());
        signer.attach(Arc::new(interactive));
        let signed = signer.sign(&request()).await.unwrap();
        assert_eq!(signed.recover_signer(&domain()).unwrap(), admin);
        wallet.await.unwrap();
    }

    #[tokio::test]
    async fn test_interactive_reject() {
        let (interactive, mut requests) =
            InteractiveSigner::channel(Address::from_bytes([1; 20]), 4);
        tokio::spawn(async move {
            requests.recv().await.unwrap().reject();
        });
        let err = PermissionSigner::new(domain())
            .sign_with(&request(), &interactive)
            .await
            .unwrap_err();
        assert_eq!(err, PermsError::UserRejectedSignature);
    }

    #[tokio::test]
    async fn test_interactive_request_dropped_is_rejection() {
        let (interactive, mut requests) =
            InteractiveSigner::channel(Address::from_bytes([1; 20]), 4);
        tokio::spawn(async move {
            drop(requests.recv().await);
        });
        let err = interactive.sign_digest(&[0u8; 32]).await.unwrap_err();
        assert_eq!(err, PermsError::UserRejectedSignature);
    }

    #[tokio::test]
    async fn test_interactive_without_wallet() {
        let (interactive, requests) = InteractiveSigner::channel(Address::from_bytes([1; 20]), 4);
        drop(requests);
        let err = interactive.sign_digest(&[0u8; 32]).await.unwrap_err();
        assert_eq!(err, PermsError::SigningUnavailable);
    }

    #[tokio::test]
    async fn test_interactive_wrong_key_rejected() {
        let (interactive, mut requests) =
            InteractiveSigner::channel(Address::from_bytes([1; 20]), 4);
        tokio::spawn(async move {
            let req = requests.recv().await.unwrap();
            let sig = KeyMaterial::generate().sign_digest(&req.digest).unwrap();
            req.approve(sig);
        });
        let err = interactive.sign_digest(&[3u8; 32]).await.unwrap_err();
        assert_eq!(err, PermsError::Core(warden_core::CoreError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_cancel_then_resign_same_request() {
        let wallet_key = KeyMaterial::generate();
        let (interactive, mut requests) = InteractiveSigner::channel(wallet_key.address(), 4);
        let mut signer = PermissionSigner::new(domain());
        signer.attach(Arc::new(interactive));
        let req = request();

        // The wallet never answers the first prompt; the caller gives up.
        let pending = tokio::time::timeout(Duration::from_millis(20), signer.sign(&req)).await;
        assert!(pending.is_err());
        let abandoned = requests.recv().await.unwrap();
        assert!(abandoned.is_cancelled());

        let wallet = tokio::spawn(async move {
            let prompt = requests.recv().await.unwrap();
            let sig = wallet_key.sign_digest(&prompt.digest).unwrap();
            prompt.approve(sig);
        });
        let signed = signer.sign(&req).await.unwrap();
        assert_eq!(signed.request.nonce, req.nonce);
        wallet.await.unwrap();
    }
}
