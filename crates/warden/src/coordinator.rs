//! The reconnect coordinator: an explicit state machine over the vault.
//!
//! ```text
//! Uninitialized ──settle──▶ HasSavedCredential ──connect──▶ Connecting ──▶ Connected
//!                      └──▶ NoSavedCredential ──generate──▶ Connecting ──▶ Failed(reason)
//! ```
//!
//! `Exporting`, `Importing` and `Removing` are side-states entered by the
//! matching operation. Every operation runs under one lock, so a single
//! coordinator never interleaves two of them; credential-level work also
//! takes the per-id lock so coordinators sharing a vault stay ordered.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use warden_core::{Address, KeyMaterial};
use warden_keystore::{EncryptedKeystore, KeystoreCodec, KeystoreError};
use warden_perms::{LocalSigner, PermissionRequest, PermissionSigner, SignedPermissionRequest};
use warden_vault::{
    CredentialSecret, CredentialVault, IdLocks, RawKey, StorageBackend, StoredCredential, Vault,
    VaultError,
};
use zeroize::Zeroizing;

use crate::config::WardenConfig;
use crate::error::{Result, WardenError};
use crate::session::ConnectionSession;
use crate::state::{CoordinatorState, FailureReason};

/// Outcome of an import.
#[derive(Debug)]
pub enum ImportOutcome {
    /// The key was saved and is now connected.
    Connected(Address),
    /// A different credential is saved. Pass the pending import to
    /// [`ReconnectCoordinator::confirm_import`] to replace it, or drop it
    /// to cancel.
    ConfirmationRequired(PendingImport),
}

/// An import waiting for the caller to approve replacing a credential.
pub struct PendingImport {
    key: KeyMaterial,
    credential: StoredCredential,
    replaces: Address,
}

impl PendingImport {
    /// Address of the key being imported.
    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// The saved credential that would be removed.
    pub fn replaces(&self) -> Address {
        self.replaces
    }
}

impl std::fmt::Debug for PendingImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingImport")
            .field("address", &self.address())
            .field("replaces", &self.replaces)
            .finish()
    }
}

struct Inner {
    session: Option<ConnectionSession>,
    /// Last credential the coordinator settled on.
    credential_id: Option<Address>,
}

/// Drives credential setup, unlock, import, export and removal.
pub struct ReconnectCoordinator<V> {
    vault: V,
    config: WardenConfig,
    codec: KeystoreCodec,
    id_locks: Arc<IdLocks>,
    state: watch::Sender<CoordinatorState>,
    inner: Mutex<Inner>,
}

/// Puts the coordinator into a transient state and restores a settled one
/// if dropped before [`finish`](Self::finish).
struct Transition<'a> {
    state: &'a watch::Sender<CoordinatorState>,
    restore: Option<CoordinatorState>,
}

impl<'a> Transition<'a> {
    fn enter(
        state: &'a watch::Sender<CoordinatorState>,
        transient: CoordinatorState,
        restore: CoordinatorState,
    ) -> Self {
        set_state(state, transient);
        Self {
            state,
            restore: Some(restore),
        }
    }

    fn finish(mut self, settled: CoordinatorState) {
        self.restore = None;
        set_state(self.state, settled);
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            set_state(self.state, restore);
        }
    }
}

fn set_state(state: &watch::Sender<CoordinatorState>, next: CoordinatorState) {
    let previous = state.send_replace(next.clone());
    if previous != next {
        info!(from = %previous, to = %next, "coordinator transition");
    }
}

fn storage_failure(e: &VaultError) -> CoordinatorState {
    CoordinatorState::Failed(FailureReason::StorageUnavailable(e.to_string()))
}

impl<B: StorageBackend> ReconnectCoordinator<Vault<B>> {
    /// Create a coordinator over a vault in `config.namespace`.
    pub fn with_backend(backend: B, config: WardenConfig) -> Self {
        let vault = Vault::new(backend, config.namespace.clone());
        Self::new(vault, config)
    }
}

impl<V: CredentialVault> ReconnectCoordinator<V> {
    /// Create a coordinator. Nothing is read until the state is first queried.
    pub fn new(vault: V, config: WardenConfig) -> Self {
        Self::with_locks(vault, config, Arc::new(IdLocks::new()))
    }

    /// Create a coordinator sharing per-id locks with others on the same vault.
    pub fn with_locks(vault: V, config: WardenConfig, id_locks: Arc<IdLocks>) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Uninitialized);
        Self {
            codec: KeystoreCodec::new(config.kdf),
            vault,
            config,
            id_locks,
            state,
            inner: Mutex::new(Inner {
                session: None,
                credential_id: None,
            }),
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// The state right now, without settling.
    pub fn current(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// The state, settling against the vault on first use.
    pub async fn state(&self) -> CoordinatorState {
        if self.current() == CoordinatorState::Uninitialized {
            let mut inner = self.inner.lock().await;
            if self.current() == CoordinatorState::Uninitialized {
                self.settle(&mut inner).await;
            }
        }
        self.current()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settling
    // ─────────────────────────────────────────────────────────────────────────

    async fn resolve_id(&self) -> std::result::Result<Option<Address>, VaultError> {
        match self.config.expected_credential {
            Some(id) => Ok(Some(id)),
            None => Ok(self.vault.ids().await?.into_iter().next()),
        }
    }

    /// Query the vault and move to a settled state.
    async fn settle(&self, inner: &mut Inner) {
        let settled = match self.resolve_id().await {
            Err(e) => {
                warn!(error = %e, "vault unavailable while settling");
                storage_failure(&e)
            }
            Ok(None) => {
                inner.credential_id = None;
                CoordinatorState::NoSavedCredential
            }
            Ok(Some(id)) => match self.vault.has(&id).await {
                Ok(true) => {
                    inner.credential_id = Some(id);
                    CoordinatorState::HasSavedCredential(id)
                }
                Ok(false) => {
                    inner.credential_id = None;
                    CoordinatorState::NoSavedCredential
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "vault unavailable while settling");
                    storage_failure(&e)
                }
            },
        };
        debug!(state = %settled, "settled");
        set_state(&self.state, settled);
    }

    async fn settled(&self, inner: &mut Inner) -> CoordinatorState {
        if self.current() == CoordinatorState::Uninitialized {
            self.settle(inner).await;
        }
        self.current()
    }

    fn invalid(&self, operation: &'static str, state: CoordinatorState) -> WardenError {
        WardenError::InvalidTransition { operation, state }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credential setup
    // ─────────────────────────────────────────────────────────────────────────

    /// Build the credential to persist for `key`.
    ///
    /// Without a password the raw key goes to platform-secured storage,
    /// which must be available.
    async fn protect(&self, key: &KeyMaterial, password: Option<&str>) -> Result<StoredCredential> {
        let secret = match password {
            Some(password) => CredentialSecret::PasswordSecured(
                self.codec
                    .encrypt_async(key.secret_bytes(), Zeroizing::new(password.to_string()))
                    .await?,
            ),
            None if self.vault.is_secure_storage_available() => {
                CredentialSecret::PlatformSecured(RawKey::from_key(key))
            }
            None => return Err(WardenError::PasswordRequired),
        };
        Ok(StoredCredential::new(
            key.address(),
            self.config.credential_name.clone(),
            secret,
        ))
    }

    /// Persist and connect. The caller holds the coordinator lock.
    async fn persist_and_connect(
        &self,
        inner: &mut Inner,
        transition: Transition<'_>,
        key: KeyMaterial,
        credential: StoredCredential,
        replaces: Option<Address>,
    ) -> Result<Address> {
        let id = key.address();
        {
            let _guard = self.id_locks.lock(&id).await;
            if let Err(e) = self.vault.save(&credential).await {
                // Any session from before stays until the new key is saved.
                if matches!(e, VaultError::StorageUnavailable(_)) {
                    inner.session = None;
                    transition.finish(storage_failure(&e));
                }
                return Err(e.into());
            }
        }

        if let Some(old) = replaces.filter(|old| *old != id) {
            let _guard = self.id_locks.lock(&old).await;
            if let Err(e) = self.vault.remove(&old).await {
                // The new credential is saved; the old one lingers until removed.
                warn!(id = %old, error = %e, "failed to remove replaced credential");
            }
        }

        inner.credential_id = Some(id);
        inner.session = Some(ConnectionSession::new(LocalSigner::new(key)));
        transition.finish(CoordinatorState::Connected(id));
        Ok(id)
    }

    /// Create a fresh key, save it and connect.
    ///
    /// With `password` the key is stored as an encrypted keystore; without
    /// one it requires platform-secured storage.
    pub async fn generate(&self, password: Option<&str>) -> Result<Address> {
        let mut inner = self.inner.lock().await;
        match self.settled(&mut inner).await {
            CoordinatorState::NoSavedCredential => {}
            CoordinatorState::HasSavedCredential(existing) => {
                return Err(WardenError::OverwriteConfirmationRequired { existing })
            }
            other => return Err(self.invalid("generate", other)),
        }

        let key = KeyMaterial::generate();
        let transition = Transition::enter(
            &self.state,
            CoordinatorState::Connecting,
            CoordinatorState::NoSavedCredential,
        );
        let credential = self.protect(&key, password).await?;
        info!(id = %key.address(), "generated credential");
        self.persist_and_connect(&mut inner, transition, key, credential, None)
            .await
    }

    /// Unlock the saved credential.
    ///
    /// A wrong password leaves the coordinator in `HasSavedCredential`.
    /// Storage and corruption failures move it to `Failed`.
    pub async fn connect(&self, password: Option<&str>) -> Result<Address> {
        let mut inner = self.inner.lock().await;
        let mut state = self.settled(&mut inner).await;
        if matches!(state, CoordinatorState::Failed(_)) {
            self.settle(&mut inner).await;
            state = self.current();
        }
        let id = match state {
            CoordinatorState::HasSavedCredential(id) => id,
            other => return Err(self.invalid("connect", other)),
        };

        let transition = Transition::enter(
            &self.state,
            CoordinatorState::Connecting,
            CoordinatorState::HasSavedCredential(id),
        );
        let _guard = self.id_locks.lock(&id).await;

        let credential = match self.vault.load(&id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                inner.credential_id = None;
                transition.finish(CoordinatorState::NoSavedCredential);
                return Err(WardenError::NoSavedCredential);
            }
            Err(e) => {
                let failed = match &e {
                    VaultError::Serialization(ctx) => {
                        CoordinatorState::Failed(FailureReason::CorruptCredential(ctx.clone()))
                    }
                    other => storage_failure(other),
                };
                transition.finish(failed);
                return Err(e.into());
            }
        };

        let key = match credential.secret {
            CredentialSecret::PlatformSecured(raw) => match raw.to_key() {
                Ok(key) => key,
                Err(e) => {
                    transition.finish(CoordinatorState::Failed(FailureReason::InvalidKey));
                    return Err(e.into());
                }
            },
            CredentialSecret::PasswordSecured(doc) => {
                let password = match password {
                    Some(password) => Zeroizing::new(password.to_string()),
                    None => return Err(WardenError::PasswordRequired),
                };
                match KeystoreCodec::decrypt_async(doc, password).await {
                    Ok(key) => key,
                    Err(KeystoreError::WrongPassword) => {
                        debug!(id = %id, "wrong password");
                        return Err(KeystoreError::WrongPassword.into());
                    }
                    Err(e) if e.is_corrupt() => {
                        transition.finish(CoordinatorState::Failed(
                            FailureReason::CorruptCredential(e.to_string()),
                        ));
                        return Err(e.into());
                    }
                    Err(KeystoreError::InvalidKey) => {
                        transition.finish(CoordinatorState::Failed(FailureReason::InvalidKey));
                        return Err(KeystoreError::InvalidKey.into());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        if key.address() != id {
            transition.finish(CoordinatorState::Failed(FailureReason::CorruptCredential(
                format!("stored key does not belong to {}", id),
            )));
            return Err(WardenError::Vault(VaultError::Serialization(
                "credential id does not match its key".into(),
            )));
        }

        inner.credential_id = Some(id);
        inner.session = Some(ConnectionSession::new(LocalSigner::new(key)));
        transition.finish(CoordinatorState::Connected(id));
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Import
    // ─────────────────────────────────────────────────────────────────────────

    async fn import(
        &self,
        inner: &mut Inner,
        key: KeyMaterial,
        credential: StoredCredential,
        transition: Transition<'_>,
        previous: &CoordinatorState,
    ) -> Result<ImportOutcome> {
        match previous.credential_id() {
            Some(existing) if existing != key.address() => {
                info!(id = %key.address(), replaces = %existing, "import needs confirmation");
                drop(transition);
                Ok(ImportOutcome::ConfirmationRequired(PendingImport {
                    key,
                    credential,
                    replaces: existing,
                }))
            }
            _ => {
                let id = self
                    .persist_and_connect(inner, transition, key, credential, None)
                    .await?;
                Ok(ImportOutcome::Connected(id))
            }
        }
    }

    fn import_origin(&self, state: CoordinatorState) -> Result<CoordinatorState> {
        match state {
            CoordinatorState::NoSavedCredential
            | CoordinatorState::HasSavedCredential(_)
            | CoordinatorState::Connected(_) => Ok(state),
            other => Err(self.invalid("import", other)),
        }
    }

    /// Import a keystore document.
    ///
    /// The document is decrypted to prove the password, then saved as-is.
    /// If a different credential is saved, nothing changes until the
    /// returned [`PendingImport`] is confirmed.
    pub async fn import_from_json(&self, document: &str, password: &str) -> Result<ImportOutcome> {
        let mut inner = self.inner.lock().await;
        let previous = self.settled(&mut inner).await;
        let previous = self.import_origin(previous)?;

        let doc = EncryptedKeystore::from_json(document)?;
        let transition =
            Transition::enter(&self.state, CoordinatorState::Importing, previous.clone());
        let key =
            KeystoreCodec::decrypt_async(doc.clone(), Zeroizing::new(password.to_string())).await?;

        let credential = StoredCredential::new(
            key.address(),
            self.config.credential_name.clone(),
            CredentialSecret::PasswordSecured(doc),
        );
        self.import(&mut inner, key, credential, transition, &previous)
            .await
    }

    /// Import raw private key bytes.
    pub async fn import_private_key(
        &self,
        private_key: &[u8],
        password: Option<&str>,
    ) -> Result<ImportOutcome> {
        let mut inner = self.inner.lock().await;
        let previous = self.settled(&mut inner).await;
        let previous = self.import_origin(previous)?;

        let key = KeyMaterial::from_private_key(private_key)?;
        let transition =
            Transition::enter(&self.state, CoordinatorState::Importing, previous.clone());
        let credential = self.protect(&key, password).await?;
        self.import(&mut inner, key, credential, transition, &previous)
            .await
    }

    /// Replace the saved credential with a pending import and connect.
    pub async fn confirm_import(&self, pending: PendingImport) -> Result<Address> {
        let mut inner = self.inner.lock().await;
        let previous = self.settled(&mut inner).await;
        if previous.credential_id() != Some(pending.replaces) {
            return Err(self.invalid("confirm import", previous));
        }

        let transition = Transition::enter(&self.state, CoordinatorState::Importing, previous);
        let PendingImport {
            key,
            credential,
            replaces,
        } = pending;
        self.persist_and_connect(&mut inner, transition, key, credential, Some(replaces))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connected operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt the connected key into a fresh keystore document.
    ///
    /// Uses a new salt and IV every time and never touches the vault.
    pub async fn export(&self, password: &str) -> Result<String> {
        let inner = self.inner.lock().await;
        let state = self.current();
        let session = match (&state, inner.session.as_ref()) {
            (CoordinatorState::Connected(_), Some(session)) => session,
            _ => return Err(self.invalid("export", state)),
        };

        let _transition = Transition::enter(&self.state, CoordinatorState::Exporting, state.clone());
        let doc = self
            .codec
            .encrypt_async(
                session.signer().key().secret_bytes(),
                Zeroizing::new(password.to_string()),
            )
            .await?;
        info!(id = %session.address(), "exported credential");
        Ok(doc.to_json_pretty()?)
    }

    /// Delete the saved credential and drop any session.
    pub async fn remove(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let previous = self.settled(&mut inner).await;
        let id = match &previous {
            CoordinatorState::Connected(id) | CoordinatorState::HasSavedCredential(id) => *id,
            CoordinatorState::Failed(_) => match inner.credential_id {
                Some(id) => id,
                None => {
                    // Nothing known to remove; settle again.
                    self.settle(&mut inner).await;
                    return Ok(());
                }
            },
            _ => return Err(self.invalid("remove", previous)),
        };

        let transition =
            Transition::enter(&self.state, CoordinatorState::Removing, previous.clone());
        {
            let _guard = self.id_locks.lock(&id).await;
            self.vault.remove(&id).await?;
        }

        info!(id = %id, "removed credential");
        inner.session = None;
        inner.credential_id = None;
        transition.finish(CoordinatorState::Uninitialized);
        self.settle(&mut inner).await;
        Ok(())
    }

    /// Drop the session, keeping the saved credential.
    pub async fn disconnect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match self.current() {
            CoordinatorState::Connected(id) => {
                inner.session = None;
                set_state(&self.state, CoordinatorState::HasSavedCredential(id));
                Ok(())
            }
            other => Err(self.invalid("disconnect", other)),
        }
    }

    /// Hand the connected key to the caller, ending the session.
    pub async fn release_signer(&self) -> Result<LocalSigner> {
        let mut inner = self.inner.lock().await;
        match (self.current(), inner.session.take()) {
            (CoordinatorState::Connected(id), Some(session)) => {
                set_state(&self.state, CoordinatorState::HasSavedCredential(id));
                Ok(session.into_signer())
            }
            (state, session) => {
                inner.session = session;
                Err(self.invalid("release signer", state))
            }
        }
    }

    /// Address of the connected wallet.
    pub async fn connected_address(&self) -> Option<Address> {
        self.inner.lock().await.session.as_ref().map(|s| s.address())
    }

    /// Sign a permission request with the connected key.
    pub async fn sign_permission(
        &self,
        signer: &PermissionSigner,
        request: &PermissionRequest,
    ) -> Result<SignedPermissionRequest> {
        let inner = self.inner.lock().await;
        let session = inner.session.as_ref().ok_or(WardenError::NotConnected)?;
        Ok(signer.sign_with(request, session.signer()).await?)
    }

    /// Leave `Failed` by querying the vault again.
    pub async fn retry(&self) -> Result<CoordinatorState> {
        let mut inner = self.inner.lock().await;
        match self.current() {
            CoordinatorState::Failed(_) => {
                self.settle(&mut inner).await;
                Ok(self.current())
            }
            other => Err(self.invalid("retry", other)),
        }
    }
}
