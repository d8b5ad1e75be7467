//! Group access filtering and membership rules.
//!
//! Nothing here is cryptographic. Group membership gates which records a
//! client fetches; grouped and ungrouped records are encrypted under the
//! same organization key, so a group boundary is an access-control
//! convenience enforced by the backend query layer, not a cryptographic
//! boundary.

use crate::backend::VaultBackend;
use crate::error::{VaultError, VaultResult};
use credvault_types::{EncryptedRecord, GroupId, GroupMembership, GroupRole, UserId};
use std::collections::HashMap;

/// Records belonging directly to the organization (no group).
pub fn direct_org_records(records: &[EncryptedRecord]) -> Vec<&EncryptedRecord> {
    records.iter().filter(|r| r.group_id.is_none()).collect()
}

/// Records belonging to one specific group.
pub fn group_records(records: &[EncryptedRecord], group_id: GroupId) -> Vec<&EncryptedRecord> {
    records
        .iter()
        .filter(|r| r.group_id == Some(group_id))
        .collect()
}

/// The group ids a user may fetch records for.
pub fn visible_groups(user_id: UserId, memberships: &[GroupMembership]) -> Vec<GroupId> {
    memberships
        .iter()
        .filter(|m| m.user_id == user_id)
        .map(|m| m.group_id)
        .collect()
}

/// Loads one group's roster from its persisted membership rows.
pub async fn load_roster<B: VaultBackend>(
    backend: &B,
    group_id: GroupId,
) -> VaultResult<GroupRoster> {
    let rows = backend.fetch_group_memberships(group_id).await?;
    Ok(GroupRoster::from_rows(group_id, &rows))
}

/// In-memory membership roster for one group, enforcing the role state
/// machine: {non-member, member, group-admin}. Only a group admin may
/// add or remove members or delete the group, and the last group admin
/// can never be removed.
pub struct GroupRoster {
    group_id: GroupId,
    members: HashMap<UserId, GroupRole>,
}

impl GroupRoster {
    pub fn new(group_id: GroupId, creator: UserId) -> Self {
        let mut members = HashMap::new();
        members.insert(creator, GroupRole::GroupAdmin);
        Self { group_id, members }
    }

    pub fn from_rows(group_id: GroupId, rows: &[GroupMembership]) -> Self {
        let members = rows
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| (m.user_id, m.role))
            .collect();
        Self { group_id, members }
    }

    pub fn role_of(&self, user_id: UserId) -> Option<GroupRole> {
        self.members.get(&user_id).copied()
    }

    fn require_admin(&self, actor: UserId) -> VaultResult<()> {
        match self.role_of(actor) {
            Some(GroupRole::GroupAdmin) => Ok(()),
            Some(GroupRole::Member) => Err(VaultError::Membership(
                "only a group admin may modify the roster".to_string(),
            )),
            None => Err(VaultError::Membership(
                "actor is not a member of this group".to_string(),
            )),
        }
    }

    fn admin_count(&self) -> usize {
        self.members
            .values()
            .filter(|r| **r == GroupRole::GroupAdmin)
            .count()
    }

    /// Adds (or re-roles) a member. Admin-only.
    pub fn add_member(
        &mut self,
        actor: UserId,
        user_id: UserId,
        role: GroupRole,
    ) -> VaultResult<GroupMembership> {
        self.require_admin(actor)?;

        // Demoting the last admin through re-add is the same hazard as
        // removing them.
        if role == GroupRole::Member
            && self.role_of(user_id) == Some(GroupRole::GroupAdmin)
            && self.admin_count() == 1
        {
            return Err(VaultError::LastGroupAdmin);
        }

        self.members.insert(user_id, role);
        Ok(GroupMembership {
            group_id: self.group_id,
            user_id,
            role,
        })
    }

    /// Removes a member. Admin-only; removing the last group admin is
    /// rejected so the group is never orphaned.
    pub fn remove_member(&mut self, actor: UserId, user_id: UserId) -> VaultResult<()> {
        self.require_admin(actor)?;

        if self.role_of(user_id) == Some(GroupRole::GroupAdmin) && self.admin_count() == 1 {
            return Err(VaultError::LastGroupAdmin);
        }

        if self.members.remove(&user_id).is_none() {
            return Err(VaultError::Membership(format!(
                "user {user_id} is not a member of this group"
            )));
        }
        Ok(())
    }

    /// Whether the actor may delete the group entirely. Admin-only.
    pub fn may_delete(&self, actor: UserId) -> bool {
        self.role_of(actor) == Some(GroupRole::GroupAdmin)
    }
}
