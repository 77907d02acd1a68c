//! Wiring of the cache, resolver, invalidation coordinator and gate

use crate::gate::AuthorizationGate;
use crate::guard::Guard;
use crate::invalidation::InvalidationCoordinator;
use crate::resolver::PermissionResolver;
use crate::store::PermissionStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use warden_cache::{
    CacheAdmin, CacheBackend, CacheMetrics, KeySpace, MemoryBackend, TieredBackend, TtlPolicy,
};
use warden_config::WardenConfig;
use warden_core::{Decision, PermissionSet, Principal, Requirement, Result};
use warden_utils::Deadline;

/// Fully wired authorization subsystem, built once at startup
pub struct Warden {
    config: WardenConfig,
    cache: Arc<TieredBackend>,
    resolver: Arc<PermissionResolver>,
    gate: Arc<AuthorizationGate>,
    invalidation: Arc<InvalidationCoordinator>,
    admin: Arc<CacheAdmin>,
    /// Periodic purge of expired fallback entries, aborted on drop
    purge_task: Option<JoinHandle<()>>,
}

impl Drop for Warden {
    fn drop(&mut self) {
        if let Some(task) = self.purge_task.take() {
            task.abort();
        }
    }
}

impl Warden {
    pub fn builder(store: Arc<dyn PermissionStore>) -> WardenBuilder {
        WardenBuilder::new(store)
    }

    pub async fn authorize(
        &self,
        principal: &Principal,
        requirement: &Requirement,
    ) -> Result<Decision> {
        self.gate.authorize(principal, requirement).await
    }

    pub async fn effective_permissions(&self, principal: &Principal) -> Result<PermissionSet> {
        self.resolver.effective_permissions(principal).await
    }

    pub fn guard(&self, requirement: Requirement) -> Guard {
        Guard::new(Arc::clone(&self.gate), requirement)
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<TieredBackend> {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    pub fn gate(&self) -> &Arc<AuthorizationGate> {
        &self.gate
    }

    pub fn invalidation(&self) -> &Arc<InvalidationCoordinator> {
        &self.invalidation
    }

    pub fn admin(&self) -> &Arc<CacheAdmin> {
        &self.admin
    }

    pub fn metrics(&self) -> &CacheMetrics {
        self.cache.metrics()
    }
}

pub struct WardenBuilder {
    store: Arc<dyn PermissionStore>,
    config: Option<WardenConfig>,
    primary: Option<Arc<dyn CacheBackend>>,
    metrics: Option<CacheMetrics>,
}

impl WardenBuilder {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self {
            store,
            config: None,
            primary: None,
            metrics: None,
        }
    }

    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `primary` instead of the backend named in the configuration
    pub fn primary(mut self, primary: Arc<dyn CacheBackend>) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn metrics(mut self, metrics: CacheMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Warden> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => CacheMetrics::new()?,
        };

        let cache_deadline = config.timeouts.cache().map_or(Deadline::none(), Deadline::after);
        let probe_deadline = config.timeouts.probe().map_or(Deadline::none(), Deadline::after);
        let store_deadline = config.timeouts.store().map_or(Deadline::none(), Deadline::after);

        let cache = Arc::new(match self.primary {
            Some(primary) => {
                TieredBackend::new(primary, Arc::new(MemoryBackend::new()), metrics.clone())
                    .with_deadlines(probe_deadline, cache_deadline)
            }
            None => TieredBackend::from_config(&config, metrics.clone())?,
        });
        let backend: Arc<dyn CacheBackend> = cache.clone();
        let policy = Arc::new(TtlPolicy::from_config(&config));
        let keys = KeySpace::new(&config.key_prefix);

        let resolver = Arc::new(
            PermissionResolver::new(
                Arc::clone(&self.store),
                Arc::clone(&backend),
                Arc::clone(&policy),
                keys.clone(),
            )
            .with_store_deadline(store_deadline),
        );
        let gate = Arc::new(AuthorizationGate::new(Arc::clone(&resolver), metrics.clone()));
        let invalidation = Arc::new(
            InvalidationCoordinator::new(self.store, backend, keys.clone(), metrics)
                .with_deadlines(cache_deadline, store_deadline),
        );
        let admin = Arc::new(CacheAdmin::new(Arc::clone(&cache), policy, keys));
        let purge_task = config
            .purge_interval()
            .and_then(|period| cache.fallback().spawn_purge_task(period));

        tracing::debug!(
            primary = cache.has_primary(),
            purge = purge_task.is_some(),
            key_prefix = %config.key_prefix,
            "Built warden"
        );
        Ok(Warden {
            config,
            cache,
            resolver,
            gate,
            invalidation,
            admin,
            purge_task,
        })
    }
}
