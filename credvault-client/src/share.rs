//! Ephemeral share envelopes.
//!
//! A share re-encrypts selected fields under a fresh one-time DEK. The
//! raw DEK travels only in the fragment portion of the returned link —
//! by construction, fragments are never transmitted to any server. A
//! password-wrapped copy (one-time DEK wrapped under the sender's master
//! secret) is persisted alongside the ciphertext so the sender can
//! reopen their own share without the link.
//!
//! Shares are time-boxed: a retention job deletes them after 24 hours,
//! and resolution treats an expired-but-present record as gone.

use crate::backend::VaultBackend;
use crate::error::{VaultError, VaultResult};
use crate::session::Session;
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use credvault_crypto::{
    KEY_SIZE, OneTimeKey, decrypt_field, encrypt_field, random_iv, unwrap_key, wrap_key,
};
use credvault_types::{RecordFields, ShareId, ShareKind, ShareRecord};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Fixed retention window after which shares are considered gone.
pub const SHARE_RETENTION_HOURS: i64 = 24;

/// A parsed share link: the share id plus the raw one-time DEK carried
/// in the URL fragment.
pub struct ShareLink {
    pub id: ShareId,
    pub key: OneTimeKey,
}

impl ShareLink {
    /// Renders the link. The key lands after `#`, which user agents never
    /// send to servers.
    pub fn to_url(&self, base: &str) -> String {
        format!(
            "{}/share/{}#{}",
            base.trim_end_matches('/'),
            self.id,
            URL_SAFE_NO_PAD.encode(self.key.as_bytes())
        )
    }

    /// Parses a share URL back into id + key.
    pub fn parse(url: &str) -> VaultResult<Self> {
        let (base, fragment) = url
            .split_once('#')
            .ok_or_else(|| VaultError::MalformedShareLink("missing fragment".to_string()))?;

        let id_str = base
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VaultError::MalformedShareLink("missing share id".to_string()))?;
        let id = Uuid::parse_str(id_str)
            .map_err(|e| VaultError::MalformedShareLink(format!("bad share id: {e}")))?;

        let key_bytes = URL_SAFE_NO_PAD
            .decode(fragment)
            .map_err(|e| VaultError::MalformedShareLink(format!("bad fragment key: {e}")))?;
        if key_bytes.len() != KEY_SIZE {
            return Err(VaultError::MalformedShareLink(format!(
                "fragment key must be {KEY_SIZE} bytes, got {}",
                key_bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&key_bytes);

        Ok(Self {
            id: ShareId(id),
            key: OneTimeKey::from_bytes(key),
        })
    }
}

/// Creates and resolves ephemeral shares.
pub struct ShareManager<B> {
    backend: Arc<B>,
    session: Session,
}

impl<B: VaultBackend> ShareManager<B> {
    pub fn new(backend: Arc<B>, session: Session) -> Self {
        Self { backend, session }
    }

    /// Builds a share: fresh one-time DEK and IV, every selected field
    /// encrypted under them, the DEK wrapped under the sender's master
    /// secret and persisted, and the raw DEK placed in the link fragment.
    pub async fn create_share(
        &self,
        fields: &RecordFields,
        kind: ShareKind,
    ) -> VaultResult<ShareLink> {
        let master = self.session.master_secret().await?;

        let one_time = OneTimeKey::generate();
        let iv = random_iv();

        let encrypt_opt = |value: &Option<String>| -> VaultResult<Option<Vec<u8>>> {
            match value {
                Some(text) => Ok(Some(encrypt_field(
                    text.as_bytes(),
                    one_time.as_bytes(),
                    &iv,
                )?)),
                None => Ok(None),
            }
        };

        // The sender's DEK acts as the "password" input to the key
        // wrapper; base64 makes it a stable text input for the KDF.
        let wrap_password = STANDARD.encode(master.as_bytes());
        let record = ShareRecord {
            id: ShareId::new(),
            encrypted_aes_key: wrap_key(one_time.as_bytes(), &wrap_password)?,
            name: encrypt_opt(&fields.name)?,
            username: encrypt_opt(&fields.username)?,
            password: encrypt_opt(&fields.password)?,
            url: encrypt_opt(&fields.url)?,
            note: encrypt_opt(&fields.note)?,
            iv: iv.to_vec(),
            kind,
            created_at: Utc::now(),
        };

        self.backend.persist_share(&record).await?;
        info!("created {kind:?} share {}", record.id);

        Ok(ShareLink {
            id: record.id,
            key: one_time,
        })
    }

    /// Resolves a share from its link. The DEK comes from the fragment,
    /// never from the persisted wrapped copy. Missing records and records
    /// past the retention window are typed "gone" failures, distinct from
    /// decryption failures.
    pub async fn resolve_share(&self, link: &ShareLink) -> VaultResult<RecordFields> {
        let record = self
            .backend
            .fetch_share(link.id)
            .await?
            .ok_or(VaultError::ShareNotFound)?;

        Self::check_retention(&record)?;
        decrypt_share_fields(&record, link.key.as_bytes())
    }

    /// Sender-side recovery: reopens an own share using the persisted
    /// wrapped copy of the one-time DEK instead of the link fragment.
    pub async fn reopen_share(&self, id: ShareId) -> VaultResult<RecordFields> {
        let master = self.session.master_secret().await?;
        let record = self
            .backend
            .fetch_share(id)
            .await?
            .ok_or(VaultError::ShareNotFound)?;

        Self::check_retention(&record)?;

        let wrap_password = STANDARD.encode(master.as_bytes());
        let one_time = unwrap_key(&record.encrypted_aes_key, &wrap_password)?;
        decrypt_share_fields(&record, &one_time)
    }

    /// Deletes shares older than the retention window.
    pub async fn purge_expired(&self) -> VaultResult<usize> {
        let cutoff = Utc::now() - Duration::hours(SHARE_RETENTION_HOURS);
        let deleted = self.backend.delete_expired_shares(cutoff).await?;
        if deleted > 0 {
            debug!("purged {deleted} expired shares");
        }
        Ok(deleted)
    }

    fn check_retention(record: &ShareRecord) -> VaultResult<()> {
        let age = Utc::now() - record.created_at;
        if age > Duration::hours(SHARE_RETENTION_HOURS) {
            return Err(VaultError::ShareExpired);
        }
        Ok(())
    }
}

/// Strict field decryption for shares: unlike list views, a share with a
/// wrong key must fail loudly, not render placeholders.
fn decrypt_share_fields(record: &ShareRecord, dek: &[u8; KEY_SIZE]) -> VaultResult<RecordFields> {
    let strict = |value: &Option<Vec<u8>>| -> VaultResult<Option<String>> {
        match value {
            Some(ciphertext) => Ok(Some(decrypt_field(ciphertext, dek, &record.iv)?)),
            None => Ok(None),
        }
    };

    Ok(RecordFields {
        name: strict(&record.name)?,
        username: strict(&record.username)?,
        password: strict(&record.password)?,
        url: strict(&record.url)?,
        note: strict(&record.note)?,
    })
}
