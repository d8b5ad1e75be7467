//! Shared test helpers: an in-memory backend with call counters.
//!
//! The mock applies scope filters only — authorization policy is the
//! real backend's concern and stays out of scope here.

// Each test binary uses a different slice of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use credvault_client::{Session, VaultBackend, VaultError, VaultResult};
use credvault_types::{
    EncryptedRecord, Group, GroupId, GroupMembership, OrgId, OrgMembership, Profile, RecordId,
    RecordScope, ShareId, ShareRecord, UserId,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryBackend {
    pub current_user: Mutex<Option<UserId>>,
    pub profiles: Mutex<HashMap<UserId, Profile>>,
    pub records: Mutex<HashMap<RecordId, EncryptedRecord>>,
    pub memberships: Mutex<Vec<OrgMembership>>,
    pub groups: Mutex<Vec<Group>>,
    pub group_memberships: Mutex<Vec<GroupMembership>>,
    pub shares: Mutex<HashMap<ShareId, ShareRecord>>,
    /// Counts every `fetch_records` call; cache tests use it to prove
    /// that concurrent refreshes share one pipeline.
    pub fetch_record_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&self, record: EncryptedRecord) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    pub fn insert_group(&self, group: Group) {
        self.groups.lock().unwrap().push(group);
    }

    pub fn record(&self, id: RecordId) -> Option<EncryptedRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub fn membership_of(&self, org: OrgId, user: UserId) -> Option<OrgMembership> {
        self.memberships
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.org_id == org && m.user_id == user)
            .cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VaultBackend for MemoryBackend {
    async fn fetch_current_user(&self) -> VaultResult<UserId> {
        self.current_user
            .lock()
            .unwrap()
            .ok_or_else(|| VaultError::Backend("no authenticated user".to_string()))
    }

    async fn fetch_profile(&self, user: UserId) -> VaultResult<Profile> {
        self.profiles
            .lock()
            .unwrap()
            .get(&user)
            .cloned()
            .ok_or_else(|| VaultError::Backend(format!("no profile for {user}")))
    }

    async fn fetch_records(&self, scope: RecordScope) -> VaultResult<Vec<EncryptedRecord>> {
        self.fetch_record_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        let matches = records
            .values()
            .filter(|r| match scope {
                RecordScope::Personal(_) => r.organization.is_none(),
                RecordScope::Org(org) => r.organization == Some(org) && r.group_id.is_none(),
                RecordScope::Group(group) => r.group_id == Some(group),
            })
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn fetch_org_memberships(&self, user: UserId) -> VaultResult<Vec<OrgMembership>> {
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user)
            .cloned()
            .collect())
    }

    async fn fetch_org_members(&self, org: OrgId) -> VaultResult<Vec<OrgMembership>> {
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.org_id == org)
            .cloned()
            .collect())
    }

    async fn fetch_groups(&self, org: OrgId) -> VaultResult<Vec<Group>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.org_id == org)
            .cloned()
            .collect())
    }

    async fn fetch_group_memberships(&self, group: GroupId) -> VaultResult<Vec<GroupMembership>> {
        Ok(self
            .group_memberships
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.group_id == group)
            .cloned()
            .collect())
    }

    async fn persist_record(&self, record: &EncryptedRecord) -> VaultResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn persist_membership(&self, membership: &OrgMembership) -> VaultResult<()> {
        let mut memberships = self.memberships.lock().unwrap();
        memberships.retain(|m| !(m.org_id == membership.org_id && m.user_id == membership.user_id));
        memberships.push(membership.clone());
        Ok(())
    }

    async fn delete_membership(&self, org: OrgId, user: UserId) -> VaultResult<()> {
        self.memberships
            .lock()
            .unwrap()
            .retain(|m| !(m.org_id == org && m.user_id == user));
        Ok(())
    }

    async fn persist_share(&self, share: &ShareRecord) -> VaultResult<()> {
        self.shares.lock().unwrap().insert(share.id, share.clone());
        Ok(())
    }

    async fn fetch_share(&self, id: ShareId) -> VaultResult<Option<ShareRecord>> {
        Ok(self.shares.lock().unwrap().get(&id).cloned())
    }

    async fn delete_expired_shares(&self, cutoff: DateTime<Utc>) -> VaultResult<usize> {
        let mut shares = self.shares.lock().unwrap();
        let before = shares.len();
        shares.retain(|_, s| s.created_at >= cutoff);
        Ok(before - shares.len())
    }
}

/// Enrolls a fresh user on a fresh session, persisting the profile in
/// the mock backend.
pub async fn enrolled_session(backend: &MemoryBackend) -> (Session, Profile) {
    let session = Session::new();
    let user_id = UserId::new();
    let profile = session
        .enroll(user_id, "a strong enough password")
        .await
        .expect("enrollment must succeed");
    backend
        .profiles
        .lock()
        .unwrap()
        .insert(user_id, profile.clone());
    *backend.current_user.lock().unwrap() = Some(user_id);
    (session, profile)
}

/// Initializes tracing output for a test run (idempotent).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}
