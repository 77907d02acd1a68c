//! Cascading cache invalidation
//!
//! Mutation paths call into the coordinator after the store change lands.
//! Affected principals are looked up before the mutation runs as well as
//! after it, so a mutation that removes memberships cannot hide its own
//! holders. Deletes go straight to the cache backend. A principal whose
//! delete fails is logged and counted; the rest of the cascade carries on,
//! and the entry still expires with its TTL.

use crate::store::PermissionStore;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;
use warden_cache::{CacheBackend, CacheMetrics, KeySpace, Removal};
use warden_core::{PermissionId, PrincipalId, Result, RoleId};
use warden_utils::tracing::invalidation_span;
use warden_utils::{within, Deadline};

/// What a mutation touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    Principal(PrincipalId),
    Role(RoleId),
    Permission(PermissionId),
    All,
}

impl InvalidationTarget {
    pub const fn scope(&self) -> &'static str {
        match self {
            Self::Principal(_) => "principal",
            Self::Role(_) => "role",
            Self::Permission(_) => "permission",
            Self::All => "all",
        }
    }
}

impl fmt::Display for InvalidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal(id) => write!(f, "principal {id}"),
            Self::Role(id) => write!(f, "role {id}"),
            Self::Permission(id) => write!(f, "permission {id}"),
            Self::All => f.write_str("all principals"),
        }
    }
}

/// Outcome of one invalidation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Principals whose entry was targeted
    pub attempted: usize,
    /// Entries that existed and were removed
    pub removed: usize,
    /// Deletes that did not complete
    pub failed: usize,
}

impl InvalidationReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, outcome: Removal) {
        self.attempted += 1;
        match outcome {
            Removal::Removed => self.removed += 1,
            Removal::Absent => {}
            Removal::Failed => self.failed += 1,
        }
    }
}

pub struct InvalidationCoordinator {
    store: Arc<dyn PermissionStore>,
    cache: Arc<dyn CacheBackend>,
    keys: KeySpace,
    metrics: CacheMetrics,
    /// Bound on each cache delete
    cache_deadline: Deadline,
    /// Bound on the affected-principal lookups
    store_deadline: Deadline,
}

impl InvalidationCoordinator {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        cache: Arc<dyn CacheBackend>,
        keys: KeySpace,
        metrics: CacheMetrics,
    ) -> Self {
        Self {
            store,
            cache,
            keys,
            metrics,
            cache_deadline: Deadline::none(),
            store_deadline: Deadline::none(),
        }
    }

    pub fn with_deadlines(mut self, cache: Deadline, store: Deadline) -> Self {
        self.cache_deadline = cache;
        self.store_deadline = store;
        self
    }

    /// Drop one principal's entry, returning whether it existed
    pub async fn invalidate_principal(&self, principal: &PrincipalId) -> bool {
        let outcome = self.delete_entry(principal).await;
        self.metrics.record_invalidation("principal", outcome.as_str());
        tracing::info!(principal = %principal, outcome = outcome.as_str(), "Invalidated permission cache");
        outcome == Removal::Removed
    }

    /// Drop the entry of every principal holding `role`
    pub async fn invalidate_role(&self, role: &RoleId) -> Result<InvalidationReport> {
        self.invalidate_holders(&InvalidationTarget::Role(role.clone()), Vec::new())
            .await
    }

    /// Drop the entry of every principal holding `permission` directly or
    /// through a role
    pub async fn invalidate_permission(
        &self,
        permission: &PermissionId,
    ) -> Result<InvalidationReport> {
        self.invalidate_holders(&InvalidationTarget::Permission(permission.clone()), Vec::new())
            .await
    }

    /// Drop every principal entry under the key prefix
    pub async fn invalidate_all(&self) -> u64 {
        let pattern = self.keys.principal_pattern();
        let removed = match self
            .cache_deadline
            .run(self.cache.delete_pattern(&pattern))
            .await
        {
            Some(removed) => {
                self.metrics.record_invalidation("all", "removed");
                removed
            }
            None => {
                tracing::warn!(pattern = %pattern, "Timed out clearing permission cache");
                self.metrics.record_invalidation("all", "failed");
                0
            }
        };
        tracing::info!(pattern = %pattern, removed, "Cleared permission cache");
        removed
    }

    /// Dispatch on `target`
    pub async fn invalidate(&self, target: &InvalidationTarget) -> Result<InvalidationReport> {
        match target {
            InvalidationTarget::Principal(id) => {
                let outcome = self.delete_entry(id).await;
                self.metrics.record_invalidation("principal", outcome.as_str());
                if outcome == Removal::Failed {
                    tracing::warn!(principal = %id, "Failed to invalidate principal");
                }
                let mut report = InvalidationReport::default();
                report.record(outcome);
                Ok(report)
            }
            InvalidationTarget::Role(id) => self.invalidate_role(id).await,
            InvalidationTarget::Permission(id) => self.invalidate_permission(id).await,
            InvalidationTarget::All => {
                let removed = self.invalidate_all().await;
                Ok(InvalidationReport {
                    attempted: usize::try_from(removed).unwrap_or(usize::MAX),
                    removed: usize::try_from(removed).unwrap_or(usize::MAX),
                    failed: 0,
                })
            }
        }
    }

    /// Run `mutation`, then invalidate `target` if it succeeded.
    ///
    /// Holders of a role or permission target are snapshotted before
    /// `mutation` is polled and merged with the holders found afterwards.
    /// Invalidation problems are logged and never fail the mutation.
    pub async fn after_mutation<T, E, F>(
        &self,
        target: InvalidationTarget,
        mutation: F,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
    {
        let before = match self.holders(&target).await {
            Some(Ok(holders)) => holders,
            Some(Err(e)) => {
                tracing::warn!(
                    invalidation = %target,
                    "Could not look up affected principals before mutation: {}",
                    e
                );
                Vec::new()
            }
            None => Vec::new(),
        };
        let value = mutation.await?;
        let outcome = match &target {
            InvalidationTarget::Role(_) | InvalidationTarget::Permission(_) => {
                self.invalidate_holders(&target, before).await
            }
            _ => self.invalidate(&target).await,
        };
        match outcome {
            Ok(report) if !report.is_complete() => tracing::warn!(
                invalidation = %target,
                failed = report.failed,
                "Invalidation after mutation was partial"
            ),
            Ok(_) => {}
            Err(e) => tracing::error!(
                invalidation = %target,
                "Invalidation after mutation failed: {}",
                e
            ),
        }
        Ok(value)
    }

    /// Current holders of a role or permission target
    async fn holders(&self, target: &InvalidationTarget) -> Option<Result<Vec<PrincipalId>>> {
        match target {
            InvalidationTarget::Role(role) => Some(
                within(
                    "principals by role",
                    self.store_deadline,
                    self.store.principals_by_role(role),
                )
                .await,
            ),
            InvalidationTarget::Permission(permission) => Some(
                within(
                    "principals by permission",
                    self.store_deadline,
                    self.store.principals_by_permission(permission),
                )
                .await,
            ),
            InvalidationTarget::Principal(_) | InvalidationTarget::All => None,
        }
    }

    /// Cascade over the current holders of `target` plus `known`
    async fn invalidate_holders(
        &self,
        target: &InvalidationTarget,
        known: Vec<PrincipalId>,
    ) -> Result<InvalidationReport> {
        let id = match target {
            InvalidationTarget::Role(role) => role.as_str(),
            InvalidationTarget::Permission(permission) => permission.as_str(),
            InvalidationTarget::Principal(principal) => principal.as_str(),
            InvalidationTarget::All => "*",
        };
        let span = invalidation_span(target.scope(), id);
        async move {
            let holders = match self.holders(target).await {
                Some(Ok(current)) => {
                    let merged: BTreeSet<PrincipalId> = known.into_iter().chain(current).collect();
                    Ok(merged.into_iter().collect())
                }
                Some(Err(e)) if !known.is_empty() => {
                    tracing::warn!(
                        "Could not look up affected principals, using the earlier snapshot: {}",
                        e
                    );
                    Ok(known)
                }
                Some(Err(e)) => Err(e),
                None => Ok(known),
            };
            self.cascade(target.scope(), holders).await
        }
        .instrument(span)
        .await
    }

    async fn cascade(
        &self,
        scope: &'static str,
        holders: Result<Vec<PrincipalId>>,
    ) -> Result<InvalidationReport> {
        let holders = holders.map_err(|e| {
            tracing::error!("Failed to look up affected principals: {}", e);
            self.metrics.record_invalidation(scope, "failed");
            e
        })?;

        let outcomes = join_all(holders.iter().map(|principal| async move {
            let outcome = self.delete_entry(principal).await;
            if outcome == Removal::Failed {
                tracing::warn!(principal = %principal, "Failed to invalidate principal, continuing");
            }
            outcome
        }))
        .await;

        let mut report = InvalidationReport::default();
        for outcome in outcomes {
            self.metrics.record_invalidation(scope, outcome.as_str());
            report.record(outcome);
        }
        tracing::info!(
            attempted = report.attempted,
            removed = report.removed,
            failed = report.failed,
            "Invalidation cascade finished"
        );
        Ok(report)
    }

    async fn delete_entry(&self, principal: &PrincipalId) -> Removal {
        let key = self.keys.principal_key(principal);
        self.cache_deadline
            .run(self.cache.remove(&key))
            .await
            .unwrap_or(Removal::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStore;
    use warden_cache::MemoryBackend;

    fn setup() -> (Arc<InMemoryStore>, Arc<MemoryBackend>, InvalidationCoordinator) {
        let store = Arc::new(
            InMemoryStore::from_json(
                r#"{
                    "permissions": [{ "id": "p-read", "code": "doc:read" }],
                    "roles": [{ "id": "editor", "name": "editor", "permissions": ["p-read"] }],
                    "principals": [
                        { "id": "a", "roles": ["editor"] },
                        { "id": "b", "roles": ["editor"] },
                        { "id": "c", "permissions": ["p-read"] },
                        { "id": "d" }
                    ]
                }"#,
            )
            .unwrap(),
        );
        let cache = Arc::new(MemoryBackend::new());
        let coordinator = InvalidationCoordinator::new(
            store.clone(),
            cache.clone(),
            KeySpace::new("principal:permissions"),
            CacheMetrics::new().unwrap(),
        );
        (store, cache, coordinator)
    }

    async fn seed(cache: &MemoryBackend, ids: &[&str]) {
        for id in ids {
            cache
                .set(&format!("principal:permissions:{id}"), "[]", 60)
                .await;
        }
    }

    #[tokio::test]
    async fn role_cascade_reaches_every_member() {
        let (_, cache, coordinator) = setup();
        seed(&cache, &["a", "b", "c", "d"]).await;

        let report = coordinator
            .invalidate_role(&RoleId::new("editor"))
            .await
            .unwrap();
        assert_eq!(
            report,
            InvalidationReport {
                attempted: 2,
                removed: 2,
                failed: 0
            }
        );
        assert_eq!(cache.key_count().await, 2);
        assert_eq!(coordinator.metrics.invalidation_count("role", "removed"), 2);
    }

    #[tokio::test]
    async fn permission_cascade_includes_direct_holders() {
        let (_, cache, coordinator) = setup();
        seed(&cache, &["a", "c", "d"]).await;

        let report = coordinator
            .invalidate_permission(&PermissionId::new("p-read"))
            .await
            .unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.removed, 2);
        assert!(cache.get("principal:permissions:d").await.is_some());
    }

    #[tokio::test]
    async fn invalidate_all_only_touches_principal_entries() {
        let (_, cache, coordinator) = setup();
        seed(&cache, &["a", "b"]).await;
        cache.set("role:permissions:editor", "[]", 60).await;

        assert_eq!(coordinator.invalidate_all().await, 2);
        assert_eq!(cache.key_count().await, 1);
    }

    #[tokio::test]
    async fn mutation_runs_before_invalidation() {
        let (store, cache, coordinator) = setup();
        seed(&cache, &["d"]).await;

        let result: std::result::Result<(), warden_core::Error> = coordinator
            .after_mutation(
                InvalidationTarget::Principal(PrincipalId::new("d")),
                async { store.set_principal_active(&PrincipalId::new("d"), false) },
            )
            .await;
        result.unwrap();
        assert!(cache.get("principal:permissions:d").await.is_none());

        seed(&cache, &["d"]).await;
        let result: std::result::Result<(), &str> = coordinator
            .after_mutation(InvalidationTarget::All, async { Err("rejected") })
            .await;
        assert_eq!(result, Err("rejected"));
        assert!(cache.get("principal:permissions:d").await.is_some());
    }

    #[tokio::test]
    async fn deleting_a_role_invalidates_its_former_members() {
        let (store, cache, coordinator) = setup();
        seed(&cache, &["a", "b", "c"]).await;

        let deleted: std::result::Result<bool, warden_core::Error> = coordinator
            .after_mutation(InvalidationTarget::Role(RoleId::new("editor")), async {
                Ok(store.delete_role(&RoleId::new("editor")))
            })
            .await;
        assert!(deleted.unwrap());
        assert!(cache.get("principal:permissions:a").await.is_none());
        assert!(cache.get("principal:permissions:b").await.is_none());
        assert!(cache.get("principal:permissions:c").await.is_some());
        assert_eq!(coordinator.metrics.invalidation_count("role", "removed"), 2);
    }

    #[tokio::test]
    async fn unassigning_through_mutation_still_reaches_the_member() {
        let (store, cache, coordinator) = setup();
        seed(&cache, &["a", "b"]).await;

        let result = coordinator
            .after_mutation(InvalidationTarget::Role(RoleId::new("editor")), async {
                Ok::<_, warden_core::Error>(
                    store.unassign_role(&PrincipalId::new("a"), &RoleId::new("editor")),
                )
            })
            .await;
        assert!(result.unwrap());
        assert_eq!(cache.key_count().await, 0);
    }

    #[tokio::test]
    async fn principal_invalidation_reports_presence() {
        let (_, cache, coordinator) = setup();
        seed(&cache, &["a"]).await;
        assert!(coordinator.invalidate_principal(&PrincipalId::new("a")).await);
        assert!(!coordinator.invalidate_principal(&PrincipalId::new("a")).await);
    }
}
