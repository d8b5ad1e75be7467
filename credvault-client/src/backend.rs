//! The external collaborator surface.
//!
//! The core calls out to exactly these operations and nothing else: it
//! never performs routing, rendering, or authorization decisions. Which
//! rows a caller may fetch is the backend's policy; what happens once
//! ciphertext and key material are in hand is the core's.

use crate::error::VaultResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use credvault_types::{
    EncryptedRecord, Group, GroupId, GroupMembership, OrgId, OrgMembership, Profile, RecordScope,
    ShareId, ShareRecord, UserId,
};

/// Storage and lookup operations provided by the application layer.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// The authenticated account on whose behalf the application is
    /// calling. Transport-level authentication is the backend's problem;
    /// the core only unlocks key material for this user.
    async fn fetch_current_user(&self) -> VaultResult<UserId>;

    async fn fetch_profile(&self, user: UserId) -> VaultResult<Profile>;

    /// Fetches encrypted records for one scope (personal, direct org, or
    /// group). Scoping is the backend's access-control filter; all org
    /// and group records decrypt under the same organization key.
    async fn fetch_records(&self, scope: RecordScope) -> VaultResult<Vec<EncryptedRecord>>;

    /// Memberships of one user across organizations.
    async fn fetch_org_memberships(&self, user: UserId) -> VaultResult<Vec<OrgMembership>>;

    /// All membership rows of one organization (for key rotation).
    async fn fetch_org_members(&self, org: OrgId) -> VaultResult<Vec<OrgMembership>>;

    async fn fetch_groups(&self, org: OrgId) -> VaultResult<Vec<Group>>;

    async fn fetch_group_memberships(&self, group: GroupId) -> VaultResult<Vec<GroupMembership>>;

    async fn persist_record(&self, record: &EncryptedRecord) -> VaultResult<()>;

    async fn persist_membership(&self, membership: &OrgMembership) -> VaultResult<()>;

    async fn delete_membership(&self, org: OrgId, user: UserId) -> VaultResult<()>;

    async fn persist_share(&self, share: &ShareRecord) -> VaultResult<()>;

    /// Returns `None` for deleted or never-existing shares; the share
    /// layer maps that to a typed "gone" failure.
    async fn fetch_share(&self, id: ShareId) -> VaultResult<Option<ShareRecord>>;

    /// Deletes shares created before the cutoff, returning how many were
    /// removed. Driven by a retention job in the application layer.
    async fn delete_expired_shares(&self, cutoff: DateTime<Utc>) -> VaultResult<usize>;
}
