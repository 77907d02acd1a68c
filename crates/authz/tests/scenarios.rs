//! The reference scenarios end to end: store, tiered cache, resolver, gate

mod common;

use common::*;
use std::sync::Arc;
use warden_authz::InvalidationTarget;
use warden_cache::{CacheBackend, TtlContext, TtlPolicy};
use warden_config::{ContextFlag, Scenario};
use warden_core::{Decision, DenyKind, Requirement, RoleId};

#[tokio::test]
async fn effective_set_is_direct_plus_role_grants() {
    let store = store();
    let warden = warden(store.clone(), InstrumentedBackend::new());
    let u = principal(&store, "u").await;

    let set = warden.effective_permissions(&u).await.unwrap();
    assert_eq!(codes(&set), ["doc:read", "doc:write", "report:export"]);
}

#[tokio::test]
async fn all_requirement_lists_missing_codes() {
    let store = store();
    let warden = warden(store.clone(), InstrumentedBackend::new());
    let u = principal(&store, "u").await;

    let granted = Requirement::all(["doc:read", "doc:write"]).unwrap();
    assert_eq!(warden.authorize(&u, &granted).await.unwrap(), Decision::Allow);

    let partial = Requirement::all(["doc:read", "admin:delete"]).unwrap();
    let decision = warden.authorize(&u, &partial).await.unwrap();
    let reason = decision.deny_reason().unwrap();
    assert_eq!(reason.kind, DenyKind::MissingAllOf);
    assert_eq!(reason.missing, ["admin:delete"]);
}

#[tokio::test]
async fn deactivated_role_disappears_after_invalidation() {
    let store = store();
    let warden = warden(store.clone(), InstrumentedBackend::new());
    let u = principal(&store, "u").await;
    warden.effective_permissions(&u).await.unwrap();

    store.set_role_active(&RoleId::new("editor"), false).unwrap();
    let stale = warden.effective_permissions(&u).await.unwrap();
    assert!(stale.contains("doc:read"), "cached entry is still served");

    let report = warden
        .invalidation()
        .invalidate_role(&RoleId::new("editor"))
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.attempted, 3);

    let fresh = warden.effective_permissions(&u).await.unwrap();
    assert_eq!(codes(&fresh), ["report:export"]);
}

#[test]
fn role_changed_ttl_ignores_peak_hours() {
    let policy = TtlPolicy::from_config(&config());
    let table = policy.table(Scenario::PrincipalPermissions).unwrap();
    let expected = table.overrides[&ContextFlag::RoleChanged];
    for hour in 0..24 {
        let context = TtlContext::at_hour(hour).with_flag(ContextFlag::RoleChanged);
        assert_eq!(policy.ttl(Scenario::PrincipalPermissions, &context), expected);
    }
    assert!(expected < table.normal.unwrap());
}

#[tokio::test]
async fn cache_outage_still_resolves_from_store() {
    let store = store();
    let warden = warden(store.clone(), Arc::new(BrokenBackend));
    let u = principal(&store, "u").await;

    let set = warden.effective_permissions(&u).await.unwrap();
    assert_eq!(codes(&set), ["doc:read", "doc:write", "report:export"]);
    let again = warden.effective_permissions(&u).await.unwrap();
    assert_eq!(set, again);
    assert_eq!(warden.cache().fallback().key_count().await, 0);
}

#[tokio::test]
async fn after_mutation_bounds_staleness() {
    let store = store();
    let warden = warden(store.clone(), InstrumentedBackend::new());
    let w = principal(&store, "w").await;
    let read = Requirement::single("doc:read").unwrap();
    assert!(warden.authorize(&w, &read).await.unwrap().is_allowed());

    let mutation_store = store.clone();
    warden
        .invalidation()
        .after_mutation(InvalidationTarget::Role(RoleId::new("auditor")), async move {
            mutation_store.set_role_permissions(&RoleId::new("auditor"), [])
        })
        .await
        .unwrap();

    let decision = warden.authorize(&w, &read).await.unwrap();
    assert_eq!(
        decision.deny_reason().map(|reason| reason.kind),
        Some(DenyKind::MissingPermission)
    );
    assert!(warden.cache().ping().await);
}

#[tokio::test]
async fn deleted_role_is_gone_for_former_members() {
    let store = store();
    let warden = warden(store.clone(), InstrumentedBackend::new());
    let u = principal(&store, "u").await;
    let read = Requirement::single("doc:read").unwrap();
    assert!(warden.authorize(&u, &read).await.unwrap().is_allowed());

    let mutation_store = store.clone();
    let deleted = warden
        .invalidation()
        .after_mutation(InvalidationTarget::Role(RoleId::new("editor")), async move {
            Ok::<_, warden_core::Error>(mutation_store.delete_role(&RoleId::new("editor")))
        })
        .await
        .unwrap();
    assert!(deleted);

    let decision = warden.authorize(&u, &read).await.unwrap();
    assert_eq!(
        decision.deny_reason().map(|reason| reason.kind),
        Some(DenyKind::MissingPermission)
    );
    let fresh = warden.effective_permissions(&u).await.unwrap();
    assert_eq!(codes(&fresh), ["report:export"]);
}
