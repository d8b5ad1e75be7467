//! Decrypted-view cache tests: coalescing, TTL, provenance, failure
//! isolation, and session-epoch invalidation.

mod support;

use credvault_client::{DecryptedViewCache, OrgDirector, Provenance, VaultBackend, encrypt_record};
use credvault_types::{Group, GroupId, RecordFields, RecordScope};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use support::MemoryBackend;

fn fields(name: &str) -> RecordFields {
    RecordFields {
        name: Some(name.to_string()),
        username: Some("user".to_string()),
        password: Some("pw".to_string()),
        url: None,
        note: None,
    }
}

fn long_ttl() -> Duration {
    Duration::from_secs(600)
}

#[tokio::test]
async fn concurrent_refreshes_share_one_pipeline() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, _profile) = support::enrolled_session(&backend).await;
    let master = session.master_secret().await.unwrap();
    backend.insert_record(encrypt_record(&fields("solo"), master.as_bytes(), None, None).unwrap());

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());

    // No orgs, so one pipeline run costs exactly one record fetch
    let (a, b) = tokio::join!(cache.refresh(false), cache.refresh(false));
    a.unwrap();
    b.unwrap();

    assert_eq!(backend.fetch_count(), 1);
    assert_eq!(cache.view().await.entries.len(), 1);
}

#[tokio::test]
async fn ttl_short_circuits_but_force_does_not() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, _profile) = support::enrolled_session(&backend).await;

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());

    cache.refresh(false).await.unwrap();
    let after_first = backend.fetch_count();

    // Within the TTL window a plain refresh is a no-op
    cache.refresh(false).await.unwrap();
    assert_eq!(backend.fetch_count(), after_first);

    // Force always rebuilds
    cache.refresh(true).await.unwrap();
    assert!(backend.fetch_count() > after_first);
}

#[tokio::test]
async fn entries_carry_their_provenance() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, _profile) = support::enrolled_session(&backend).await;
    let master = session.master_secret().await.unwrap();

    let orgs = OrgDirector::new(backend.clone(), session.clone());
    let org_id = orgs.create_org().await.unwrap();
    let membership = orgs.own_membership(org_id).await.unwrap();
    let org_key = orgs.reveal_org_key(&membership).await.unwrap();

    let group_id = GroupId::new();
    backend.insert_group(Group {
        id: group_id,
        org_id,
        name: "infra".to_string(),
    });

    let personal = encrypt_record(&fields("personal"), master.as_bytes(), None, None).unwrap();
    let direct = encrypt_record(&fields("direct"), org_key.as_bytes(), Some(org_id), None).unwrap();
    let grouped = encrypt_record(
        &fields("grouped"),
        org_key.as_bytes(),
        Some(org_id),
        Some(group_id),
    )
    .unwrap();
    backend.insert_record(personal.clone());
    backend.insert_record(direct.clone());
    backend.insert_record(grouped.clone());

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());
    cache.refresh(false).await.unwrap();
    let view = cache.view().await;

    assert!(view.org_failures.is_empty());
    assert_eq!(view.entries.len(), 3);

    let entry = |id| view.entries.iter().find(|e| e.record_id == id).unwrap();
    assert_eq!(entry(personal.id).provenance, Provenance::Personal);
    assert_eq!(entry(personal.id).fields, fields("personal"));
    assert_eq!(entry(direct.id).provenance, Provenance::Organization(org_id));
    assert_eq!(
        entry(grouped.id).provenance,
        Provenance::Group {
            org: org_id,
            group_id,
            group_name: "infra".to_string(),
        }
    );
    assert_eq!(entry(grouped.id).fields, fields("grouped"));
}

#[tokio::test]
async fn one_failing_org_does_not_take_down_the_others() {
    support::init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let (session, profile) = support::enrolled_session(&backend).await;

    let orgs = OrgDirector::new(backend.clone(), session.clone());
    let good_org = orgs.create_org().await.unwrap();
    let bad_org = orgs.create_org().await.unwrap();

    let good_key = orgs
        .reveal_org_key(&orgs.own_membership(good_org).await.unwrap())
        .await
        .unwrap();
    let record =
        encrypt_record(&fields("survivor"), good_key.as_bytes(), Some(good_org), None).unwrap();
    backend.insert_record(record.clone());

    // Corrupt the wrapped key for the second organization
    {
        let mut memberships = backend.memberships.lock().unwrap();
        let row = memberships
            .iter_mut()
            .find(|m| m.org_id == bad_org && m.user_id == profile.user_id)
            .unwrap();
        row.encrypted_org_key = vec![0u8; 32];
    }

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());
    cache.refresh(false).await.unwrap();
    let view = cache.view().await;

    // The healthy organization's entries survive
    assert!(view.entries.iter().any(|e| e.record_id == record.id));

    // The broken one is reported, not fatal
    assert_eq!(view.org_failures.len(), 1);
    assert_eq!(view.org_failures[0].0, bad_org);
}

#[tokio::test]
async fn unaccepted_invitations_are_skipped() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, profile) = support::enrolled_session(&backend).await;

    let orgs = OrgDirector::new(backend.clone(), session.clone());
    let org_id = orgs.create_org().await.unwrap();

    // Flip the creator's membership back to pending
    {
        let mut memberships = backend.memberships.lock().unwrap();
        let row = memberships
            .iter_mut()
            .find(|m| m.org_id == org_id && m.user_id == profile.user_id)
            .unwrap();
        row.has_accepted = false;
    }

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());
    cache.refresh(false).await.unwrap();

    // Pending org fetched nothing beyond the personal scope
    assert_eq!(backend.fetch_count(), 1);
    assert!(cache.view().await.org_failures.is_empty());
}

#[tokio::test]
async fn session_epoch_change_invalidates_a_fresh_view() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, profile) = support::enrolled_session(&backend).await;
    let master = session.master_secret().await.unwrap();
    backend.insert_record(encrypt_record(&fields("mine"), master.as_bytes(), None, None).unwrap());

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session.clone(), long_ttl());
    cache.refresh(false).await.unwrap();
    let after_first = backend.fetch_count();

    // Same epoch, inside TTL: no rebuild
    cache.refresh(false).await.unwrap();
    assert_eq!(backend.fetch_count(), after_first);

    // A logout/login cycle bumps the epoch, so the next refresh rebuilds
    // even though the TTL has not elapsed
    session.logout().await;
    session
        .login(&profile, "a strong enough password")
        .await
        .unwrap();

    cache.refresh(false).await.unwrap();
    assert!(backend.fetch_count() > after_first);
    assert_eq!(cache.view().await.entries.len(), 1);
}

#[tokio::test]
async fn refresh_fails_cleanly_when_the_session_is_closed() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, _profile) = support::enrolled_session(&backend).await;
    session.logout().await;

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());
    assert!(cache.refresh(false).await.is_err());
    assert!(cache.view().await.entries.is_empty());
}

#[tokio::test]
async fn undecryptable_record_renders_a_placeholder_not_an_error() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, _profile) = support::enrolled_session(&backend).await;
    let master = session.master_secret().await.unwrap();

    let good = encrypt_record(&fields("good"), master.as_bytes(), None, None).unwrap();
    let mut mangled = encrypt_record(&fields("bad"), master.as_bytes(), None, None).unwrap();
    mangled.name = Some(vec![0u8; 15]);
    backend.insert_record(good.clone());
    backend.insert_record(mangled.clone());

    let cache = DecryptedViewCache::with_ttl(backend.clone(), session, long_ttl());
    cache.refresh(false).await.unwrap();
    let view = cache.view().await;

    let entry = |id| view.entries.iter().find(|e| e.record_id == id).unwrap();
    assert_eq!(entry(good.id).fields, fields("good"));
    assert_eq!(
        entry(mangled.id).fields.name.as_deref(),
        Some(credvault_client::DECRYPT_PLACEHOLDER)
    );
    // Untouched fields in the same record still decrypt
    assert_eq!(entry(mangled.id).fields.username.as_deref(), Some("user"));
}

#[tokio::test]
async fn records_scope_fetches_stay_partitioned() {
    let backend = Arc::new(MemoryBackend::new());
    let (session, profile) = support::enrolled_session(&backend).await;
    let master = session.master_secret().await.unwrap();

    let orgs = OrgDirector::new(backend.clone(), session.clone());
    let org_id = orgs.create_org().await.unwrap();
    let org_key = orgs
        .reveal_org_key(&orgs.own_membership(org_id).await.unwrap())
        .await
        .unwrap();

    backend.insert_record(
        encrypt_record(&fields("personal"), master.as_bytes(), None, None).unwrap(),
    );
    backend.insert_record(
        encrypt_record(&fields("org"), org_key.as_bytes(), Some(org_id), None).unwrap(),
    );

    // Personal scope never returns org records and vice versa
    let personal = backend
        .fetch_records(RecordScope::Personal(profile.user_id))
        .await
        .unwrap();
    assert_eq!(personal.len(), 1);
    assert!(personal[0].organization.is_none());

    let org = backend.fetch_records(RecordScope::Org(org_id)).await.unwrap();
    assert_eq!(org.len(), 1);
    assert_eq!(org[0].organization, Some(org_id));
}
