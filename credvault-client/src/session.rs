//! Session state: the master secret and unwrapped identity keypair.
//!
//! All key material lives in one process-wide session object. Login,
//! logout, and password change replace the whole state atomically and
//! bump an epoch counter; the decrypted-view cache snapshots the epoch so
//! stale plaintext is never served across a key change.

use crate::backend::VaultBackend;
use crate::error::{VaultError, VaultResult};
use credvault_crypto::{IdentityKeyPair, MasterSecret, unwrap_key, wrap_key};
use credvault_types::{Profile, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;

struct SessionState {
    user_id: UserId,
    master: MasterSecret,
    identity: IdentityKeyPair,
}

/// Process-wide authenticated session.
#[derive(Clone)]
pub struct Session {
    state: Arc<RwLock<Option<SessionState>>>,
    epoch: Arc<AtomicU64>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// First-time enrollment: mints a master secret and identity keypair,
    /// wraps both, installs the session, and returns the profile the
    /// caller must persist. The master secret is created exactly once per
    /// account and never regenerated.
    pub async fn enroll(&self, user_id: UserId, password: &str) -> VaultResult<Profile> {
        if password.len() < 8 {
            return Err(VaultError::InvalidPassword);
        }

        let master = MasterSecret::generate();
        let identity = IdentityKeyPair::generate()?;

        let profile = Profile {
            user_id,
            personal_wrapped_key: wrap_key(master.as_bytes(), password)?,
            public_key: identity.export_public()?,
            wrapped_private_key: identity.wrap_private(&master)?,
        };

        self.install(SessionState {
            user_id,
            master,
            identity,
        })
        .await;
        info!("enrolled user {user_id}");

        Ok(profile)
    }

    /// Unwraps the master secret and private key from a stored profile
    /// and atomically installs the new session state.
    pub async fn login(&self, profile: &Profile, password: &str) -> VaultResult<()> {
        let dek = unwrap_key(&profile.personal_wrapped_key, password)
            .map_err(|_| VaultError::InvalidPassword)?;
        let master = MasterSecret::from_bytes(dek);

        // Authenticated unwrap: succeeds only with the right master, so a
        // padding accident above cannot slip through.
        let identity = IdentityKeyPair::unwrap_private(&profile.wrapped_private_key, &master)
            .map_err(|_| VaultError::InvalidPassword)?;

        self.install(SessionState {
            user_id: profile.user_id,
            master,
            identity,
        })
        .await;
        info!("session opened for user {}", profile.user_id);

        Ok(())
    }

    /// Resolves the backend's current user, fetches their profile, and
    /// logs in. Convenience for the common unlock path where the
    /// application layer has already authenticated the transport.
    pub async fn login_current<B: VaultBackend>(
        &self,
        backend: &B,
        password: &str,
    ) -> VaultResult<()> {
        let user_id = backend.fetch_current_user().await?;
        let profile = backend.fetch_profile(user_id).await?;
        self.login(&profile, password).await
    }

    /// Clears all key material and invalidates any cached plaintext.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        *state = None;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        info!("session closed");
    }

    /// Re-wraps the *same* master secret under a new password and returns
    /// the updated profile to persist. The master secret is stable for
    /// the account lifetime, so no record re-encryption is needed.
    pub async fn change_password(
        &self,
        profile: &Profile,
        old_password: &str,
        new_password: &str,
    ) -> VaultResult<Profile> {
        if new_password.len() < 8 {
            return Err(VaultError::InvalidPassword);
        }

        let dek = unwrap_key(&profile.personal_wrapped_key, old_password)
            .map_err(|_| VaultError::InvalidPassword)?;
        let master = MasterSecret::from_bytes(dek);

        let identity = IdentityKeyPair::unwrap_private(&profile.wrapped_private_key, &master)
            .map_err(|_| VaultError::InvalidPassword)?;

        let updated = Profile {
            user_id: profile.user_id,
            personal_wrapped_key: wrap_key(master.as_bytes(), new_password)?,
            public_key: profile.public_key.clone(),
            wrapped_private_key: profile.wrapped_private_key.clone(),
        };

        self.install(SessionState {
            user_id: profile.user_id,
            master,
            identity,
        })
        .await;
        info!("password changed for user {}", profile.user_id);

        Ok(updated)
    }

    async fn install(&self, new_state: SessionState) {
        let mut state = self.state.write().await;
        *state = Some(new_state);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Monotonic counter bumped on every login/logout/password change.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn user_id(&self) -> VaultResult<UserId> {
        let state = self.state.read().await;
        state
            .as_ref()
            .map(|s| s.user_id)
            .ok_or(VaultError::KeyUnavailable)
    }

    /// The session master secret, or `KeyUnavailable` if no one is
    /// logged in (treated as "must re-authenticate").
    pub async fn master_secret(&self) -> VaultResult<MasterSecret> {
        let state = self.state.read().await;
        state
            .as_ref()
            .map(|s| s.master.clone())
            .ok_or(VaultError::KeyUnavailable)
    }

    /// The unwrapped identity keypair for asymmetric operations.
    pub async fn identity(&self) -> VaultResult<IdentityKeyPair> {
        let state = self.state.read().await;
        state
            .as_ref()
            .map(|s| s.identity.clone())
            .ok_or(VaultError::KeyUnavailable)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
