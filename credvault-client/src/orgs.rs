//! Organization key distribution and membership orchestration.
//!
//! Mints one symmetric key per organization and hands it to each member
//! as an RSA-OAEP ciphertext under that member's public key. The
//! plaintext key is revealed on demand with the session private key and
//! held only for the session lifetime.
//!
//! Removing a member deletes their wrapped copy and then rotates the
//! organization key: a deleted member who cached the old key must not
//! retain read access to future records, so every remaining member gets
//! a fresh sealed copy and every affected record is re-encrypted.

use crate::backend::VaultBackend;
use crate::error::{VaultError, VaultResult};
use crate::records::reencrypt_record;
use crate::session::Session;
use credvault_crypto::{OrganizationKey, open_for_member, seal_for_member};
use credvault_types::{OrgId, OrgMembership, OrgRole, Profile, RecordScope, UserId};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates organization key lifecycle: create, invite, reveal,
/// remove-with-rotation.
pub struct OrgDirector<B> {
    backend: Arc<B>,
    session: Session,
}

impl<B: VaultBackend> OrgDirector<B> {
    pub fn new(backend: Arc<B>, session: Session) -> Self {
        Self { backend, session }
    }

    /// Creates an organization: mints a fresh key (held only in memory),
    /// seals one copy for the creator, and persists their admin
    /// membership.
    pub async fn create_org(&self) -> VaultResult<OrgId> {
        let user_id = self.session.user_id().await?;
        let identity = self.session.identity().await?;

        let org_id = OrgId::new();
        let org_key = OrganizationKey::generate();
        let sealed = seal_for_member(&org_key, &identity.export_public()?)?;

        self.backend
            .persist_membership(&OrgMembership {
                org_id,
                user_id,
                encrypted_org_key: sealed,
                role: OrgRole::Admin,
                has_accepted: true,
            })
            .await?;

        info!("created organization {org_id}");
        Ok(org_id)
    }

    /// Invites a member: seals exactly one copy of the organization key
    /// under the invitee's public key. A malformed or absent public key
    /// fails closed — no membership row is created.
    pub async fn invite_member(
        &self,
        org_id: OrgId,
        invitee: &Profile,
        role: OrgRole,
    ) -> VaultResult<()> {
        let org_key = self.reveal_own_key(org_id).await?;
        let sealed = seal_for_member(&org_key, &invitee.public_key)?;

        self.backend
            .persist_membership(&OrgMembership {
                org_id,
                user_id: invitee.user_id,
                encrypted_org_key: sealed,
                role,
                has_accepted: false,
            })
            .await?;

        info!("invited user {} to organization {org_id}", invitee.user_id);
        Ok(())
    }

    /// Marks the caller's own pending membership as accepted.
    pub async fn accept_invite(&self, org_id: OrgId) -> VaultResult<()> {
        let mut membership = self.own_membership(org_id).await?;
        membership.has_accepted = true;
        self.backend.persist_membership(&membership).await?;
        Ok(())
    }

    /// Opens a sealed organization key with the session private key.
    pub async fn reveal_org_key(
        &self,
        membership: &OrgMembership,
    ) -> VaultResult<OrganizationKey> {
        let identity = self.session.identity().await?;
        Ok(open_for_member(&membership.encrypted_org_key, &identity)?)
    }

    /// Removes a member: deletes that member's wrapped copy and nothing
    /// else, then rotates the organization key so the removed member's
    /// cached copy goes stale.
    pub async fn remove_member(&self, org_id: OrgId, user_id: UserId) -> VaultResult<()> {
        self.backend.delete_membership(org_id, user_id).await?;
        info!("removed user {user_id} from organization {org_id}");
        self.rotate_org_key(org_id).await
    }

    /// Rotates the organization key: re-seals a fresh key for every
    /// remaining member and re-encrypts all org and group records.
    ///
    /// All strict decrypts, re-encrypts, and seals happen in memory
    /// before the first write. Decryption of a corrupted record is the
    /// realistic failure here, and it must abort while the old sealed
    /// copies and old ciphertext are still fully intact — otherwise one
    /// bad field would strand every record in the organization.
    pub async fn rotate_org_key(&self, org_id: OrgId) -> VaultResult<()> {
        let old_key = self.reveal_own_key(org_id).await?;
        let new_key = OrganizationKey::generate();

        // Direct org records, then every group's records — they all sit
        // under the same organization key.
        let mut records = self.backend.fetch_records(RecordScope::Org(org_id)).await?;
        for group in self.backend.fetch_groups(org_id).await? {
            records.extend(
                self.backend
                    .fetch_records(RecordScope::Group(group.id))
                    .await?,
            );
        }

        let mut rotated = Vec::with_capacity(records.len());
        for record in &records {
            rotated.push(reencrypt_record(
                record,
                old_key.as_bytes(),
                new_key.as_bytes(),
            )?);
        }

        let members = self.backend.fetch_org_members(org_id).await?;
        let mut resealed = Vec::with_capacity(members.len());
        for mut membership in members {
            let profile = self.backend.fetch_profile(membership.user_id).await?;
            membership.encrypted_org_key = seal_for_member(&new_key, &profile.public_key)?;
            resealed.push(membership);
        }

        // Everything that can fail has succeeded; now persist.
        for membership in &resealed {
            self.backend.persist_membership(membership).await?;
        }
        for record in &rotated {
            self.backend.persist_record(record).await?;
        }

        info!(
            "rotated key for organization {org_id} ({} records re-encrypted)",
            rotated.len()
        );
        Ok(())
    }

    /// The caller's own membership row in the given organization.
    pub async fn own_membership(&self, org_id: OrgId) -> VaultResult<OrgMembership> {
        let user_id = self.session.user_id().await?;
        let memberships = self.backend.fetch_org_memberships(user_id).await?;
        memberships
            .into_iter()
            .find(|m| m.org_id == org_id)
            .ok_or_else(|| VaultError::Membership(format!("not a member of {org_id}")))
    }

    async fn reveal_own_key(&self, org_id: OrgId) -> VaultResult<OrganizationKey> {
        let membership = self.own_membership(org_id).await?;
        debug!("revealing key for organization {org_id}");
        self.reveal_org_key(&membership).await
    }
}
