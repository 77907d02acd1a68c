//! Effective permission resolution with a read-through cache
//!
//! On a miss the resolver reads the store, computes
//! `direct ∪ role-inherited` (both already filtered to active grants) and
//! writes the result back with the `principal_permissions` TTL. Cache
//! failures degrade to a direct store read. Store failures are returned to
//! the caller, never turned into an empty set.

use crate::store::PermissionStore;
use std::sync::Arc;
use warden_cache::{codec, CacheBackend, KeySpace, TtlContext, TtlPolicy};
use warden_config::Scenario;
use warden_core::{PermissionSet, Principal, PrincipalId, Result};
use warden_utils::{within, Deadline};

pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    cache: Arc<dyn CacheBackend>,
    policy: Arc<TtlPolicy>,
    keys: KeySpace,
    /// Bound on each store read
    store_deadline: Deadline,
}

impl PermissionResolver {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        cache: Arc<dyn CacheBackend>,
        policy: Arc<TtlPolicy>,
        keys: KeySpace,
    ) -> Self {
        Self {
            store,
            cache,
            policy,
            keys,
            store_deadline: Deadline::none(),
        }
    }

    pub fn with_store_deadline(mut self, deadline: Deadline) -> Self {
        self.store_deadline = deadline;
        self
    }

    pub fn store(&self) -> &Arc<dyn PermissionStore> {
        &self.store
    }

    pub fn store_deadline(&self) -> Deadline {
        self.store_deadline
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Effective permissions of `principal`, served from cache when possible
    pub async fn effective_permissions(&self, principal: &Principal) -> Result<PermissionSet> {
        if principal.is_superuser {
            return Ok(PermissionSet::All);
        }

        let key = self.keys.principal_key(&principal.id);
        if let Some(cached) = self.read_cached(&key).await {
            return Ok(cached);
        }

        let permissions = self.compute(&principal.id).await?;
        self.write_back(&key, &permissions).await;
        Ok(permissions)
    }

    /// Look the principal up in the store first, then resolve
    pub async fn effective_permissions_by_id(&self, id: &PrincipalId) -> Result<PermissionSet> {
        let principal = self.load_principal(id).await?;
        self.effective_permissions(&principal).await
    }

    /// Read the store directly, leaving the cache untouched
    pub async fn resolve_fresh(&self, principal: &Principal) -> Result<PermissionSet> {
        if principal.is_superuser {
            return Ok(PermissionSet::All);
        }
        self.compute(&principal.id).await
    }

    /// Recompute from the store and replace the cached entry
    pub async fn refresh(&self, principal: &Principal) -> Result<PermissionSet> {
        let permissions = self.resolve_fresh(principal).await?;
        if !permissions.is_all() {
            let key = self.keys.principal_key(&principal.id);
            self.write_back(&key, &permissions).await;
        }
        Ok(permissions)
    }

    pub async fn load_principal(&self, id: &PrincipalId) -> Result<Principal> {
        within("get principal", self.store_deadline, self.store.get_principal(id)).await
    }

    async fn read_cached(&self, key: &str) -> Option<PermissionSet> {
        let raw = self.cache.get(key).await?;
        match codec::decode::<PermissionSet>(key, &raw) {
            Ok(PermissionSet::All) => {
                tracing::warn!(key, "Discarding wildcard permission entry from cache");
                self.cache.delete(key).await;
                None
            }
            Ok(permissions) => Some(permissions),
            Err(e) => {
                tracing::warn!(key, "Discarding unreadable permission entry: {}", e);
                self.cache.delete(key).await;
                None
            }
        }
    }

    async fn write_back(&self, key: &str, permissions: &PermissionSet) {
        let raw = match codec::encode(key, permissions) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "Failed to encode permission entry: {}", e);
                return;
            }
        };
        let ttl = self
            .policy
            .ttl(Scenario::PrincipalPermissions, &TtlContext::now());
        if self.cache.set(key, &raw, ttl).await {
            tracing::debug!(key, ttl, count = permissions.len(), "Cached effective permissions");
        } else {
            tracing::warn!(key, "Failed to cache effective permissions, serving uncached");
        }
    }

    async fn compute(&self, principal: &PrincipalId) -> Result<PermissionSet> {
        let result = tokio::try_join!(
            within(
                "direct grants",
                self.store_deadline,
                self.store.direct_grants(principal)
            ),
            within(
                "role grants",
                self.store_deadline,
                self.store.role_grants(principal)
            ),
        );
        match result {
            Ok((direct, inherited)) => Ok(direct.into_iter().chain(inherited).collect()),
            Err(e) => {
                tracing::error!(principal = %principal, "Failed to resolve permissions: {}", e);
                Err(e)
            }
        }
    }
}
