//! Decrypted-view cache.
//!
//! Sits above the session, org director, and field cipher so repeated
//! "decrypt everything visible to this user" calls coalesce into one
//! pipeline. A short TTL short-circuits redundant refreshes; a refresh
//! gate makes concurrent callers share a single in-flight pipeline; a
//! session-epoch snapshot guarantees stale plaintext is never served
//! after a login, logout, or password change.
//!
//! Per-organization pipelines fan out concurrently; each pipeline's own
//! steps (reveal key, fetch records, decrypt, fetch groups, decrypt) run
//! strictly in order. One organization failing is logged and reported in
//! the view without aborting the others.

use crate::backend::VaultBackend;
use crate::error::VaultResult;
use crate::orgs::OrgDirector;
use crate::records::decrypt_record;
use crate::session::Session;
use credvault_types::{GroupId, OrgId, OrgMembership, RecordFields, RecordId, RecordScope};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Default freshness window for `refresh(false)`.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

/// Where a decrypted entry came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    Personal,
    Organization(OrgId),
    Group {
        org: OrgId,
        group_id: GroupId,
        group_name: String,
    },
}

/// One decrypted record with its provenance tag.
#[derive(Clone, Debug)]
pub struct DecryptedEntry {
    pub record_id: RecordId,
    pub fields: RecordFields,
    pub provenance: Provenance,
}

/// The readable store populated by a refresh: decrypted entries plus any
/// per-organization failures from the last pipeline run.
#[derive(Clone, Debug, Default)]
pub struct DecryptedView {
    pub entries: Vec<DecryptedEntry>,
    pub org_failures: Vec<(OrgId, String)>,
}

struct CacheState {
    view: Arc<DecryptedView>,
    refreshed_at: Option<Instant>,
    epoch: u64,
}

/// Request-deduplicating, TTL-bounded cache of the fully decrypted view.
/// Constructed once per session and torn down with it — no ambient
/// module-level state.
pub struct DecryptedViewCache<B> {
    backend: Arc<B>,
    session: Session,
    orgs: OrgDirector<B>,
    ttl: Duration,
    state: RwLock<CacheState>,
    /// Serializes pipeline runs; concurrent callers queue here and find
    /// a fresh view on the post-acquisition TTL re-check.
    refresh_gate: Mutex<()>,
}

impl<B: VaultBackend> DecryptedViewCache<B> {
    pub fn new(backend: Arc<B>, session: Session) -> Self {
        Self::with_ttl(backend, session, DEFAULT_TTL)
    }

    pub fn with_ttl(backend: Arc<B>, session: Session, ttl: Duration) -> Self {
        let orgs = OrgDirector::new(backend.clone(), session.clone());
        Self {
            backend,
            session,
            orgs,
            ttl,
            state: RwLock::new(CacheState {
                view: Arc::new(DecryptedView::default()),
                refreshed_at: None,
                epoch: 0,
            }),
            refresh_gate: Mutex::new(()),
        }
    }

    /// The most recently built view (empty before the first refresh).
    pub async fn view(&self) -> Arc<DecryptedView> {
        self.state.read().await.view.clone()
    }

    /// Rebuilds the decrypted view. Idempotent and safe to call
    /// concurrently: callers inside the TTL window share one underlying
    /// pipeline run. `force` bypasses the TTL but still coalesces with
    /// an in-flight run.
    pub async fn refresh(&self, force: bool) -> VaultResult<()> {
        let epoch = self.session.epoch();

        if !force && self.is_fresh(epoch).await {
            return Ok(());
        }

        let _gate = self.refresh_gate.lock().await;

        // A concurrent caller may have refreshed while we waited.
        if !force && self.is_fresh(epoch).await {
            debug!("refresh coalesced with a just-completed run");
            return Ok(());
        }

        let view = self.build_view().await?;

        // Last-writer-wins: if the session changed underneath this run,
        // its plaintext belongs to a dead epoch and must not be served.
        let mut state = self.state.write().await;
        if self.session.epoch() != epoch {
            debug!("discarding refresh result from superseded session epoch");
            return Ok(());
        }
        state.view = Arc::new(view);
        state.refreshed_at = Some(Instant::now());
        state.epoch = epoch;

        Ok(())
    }

    async fn is_fresh(&self, epoch: u64) -> bool {
        let state = self.state.read().await;
        state.epoch == epoch
            && state
                .refreshed_at
                .is_some_and(|at| at.elapsed() < self.ttl)
    }

    async fn build_view(&self) -> VaultResult<DecryptedView> {
        let user_id = self.session.user_id().await?;
        let master = self.session.master_secret().await?;

        let mut view = DecryptedView::default();

        // Personal records under the master secret
        let personal = self
            .backend
            .fetch_records(RecordScope::Personal(user_id))
            .await?;
        for record in &personal {
            view.entries.push(DecryptedEntry {
                record_id: record.id,
                fields: decrypt_record(record, master.as_bytes()),
                provenance: Provenance::Personal,
            });
        }

        // Fan out per accepted organization; one failure does not abort
        // the others.
        let memberships: Vec<OrgMembership> = self
            .backend
            .fetch_org_memberships(user_id)
            .await?
            .into_iter()
            .filter(|m| m.has_accepted)
            .collect();

        let results = join_all(memberships.iter().map(|m| self.org_pipeline(m))).await;
        for (membership, result) in memberships.iter().zip(results) {
            match result {
                Ok(mut entries) => view.entries.append(&mut entries),
                Err(e) => {
                    warn!("organization {} pipeline failed: {e}", membership.org_id);
                    view.org_failures.push((membership.org_id, e.to_string()));
                }
            }
        }

        info!(
            "view refreshed: {} entries, {} org failures",
            view.entries.len(),
            view.org_failures.len()
        );
        Ok(view)
    }

    /// One organization's pipeline. Steps are strictly sequential:
    /// reveal key → fetch org records → decrypt → fetch groups → fetch
    /// and decrypt each group's records.
    async fn org_pipeline(&self, membership: &OrgMembership) -> VaultResult<Vec<DecryptedEntry>> {
        let org_id = membership.org_id;
        let org_key = self.orgs.reveal_org_key(membership).await?;

        let mut entries = Vec::new();

        let org_records = self.backend.fetch_records(RecordScope::Org(org_id)).await?;
        for record in &org_records {
            entries.push(DecryptedEntry {
                record_id: record.id,
                fields: decrypt_record(record, org_key.as_bytes()),
                provenance: Provenance::Organization(org_id),
            });
        }

        for group in self.backend.fetch_groups(org_id).await? {
            let group_records = self
                .backend
                .fetch_records(RecordScope::Group(group.id))
                .await?;
            for record in &group_records {
                entries.push(DecryptedEntry {
                    record_id: record.id,
                    fields: decrypt_record(record, org_key.as_bytes()),
                    provenance: Provenance::Group {
                        org: org_id,
                        group_id: group.id,
                        group_name: group.name.clone(),
                    },
                });
            }
        }

        debug!("organization {org_id} pipeline produced {} entries", entries.len());
        Ok(entries)
    }
}
