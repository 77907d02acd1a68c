//! Primary/fallback routing
//!
//! `TieredBackend` is the single `CacheBackend` the rest of the system sees.
//! Before each operation it probes the primary; while the probe fails, the
//! operation runs against the in-process fallback instead. Health is never
//! remembered between operations, so a recovered primary is picked up on the
//! very next call.

use super::{BackendKind, CacheBackend, KeyTtl, MemoryBackend, RedisBackend, Removal};
use crate::errors::Result;
use crate::keys::KeySpace;
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use warden_config::WardenConfig;
use warden_utils::Deadline;

pub struct TieredBackend {
    primary: Option<Arc<dyn CacheBackend>>,
    fallback: Arc<MemoryBackend>,
    /// Bound on the health probe
    probe: Deadline,
    /// Bound on each delegated operation
    deadline: Deadline,
    metrics: CacheMetrics,
    /// Last observed primary health, for logging transitions only
    last_up: AtomicBool,
}

/// Backend-level snapshot for operators
#[derive(Debug, Clone, Serialize)]
pub struct BackendStats {
    /// Backend that currently serves requests
    pub backend: BackendKind,
    pub primary_configured: bool,
    pub primary_up: bool,
    pub key_count: u64,
    pub fallback_key_count: u64,
}

impl TieredBackend {
    /// Route to `primary` while it is healthy, else to `fallback`
    pub fn new(
        primary: Arc<dyn CacheBackend>,
        fallback: Arc<MemoryBackend>,
        metrics: CacheMetrics,
    ) -> Self {
        Self {
            primary: Some(primary),
            fallback,
            probe: Deadline::none(),
            deadline: Deadline::none(),
            metrics,
            last_up: AtomicBool::new(false),
        }
    }

    /// Serve everything from the in-process backend
    pub fn memory_only(fallback: Arc<MemoryBackend>, metrics: CacheMetrics) -> Self {
        metrics.set_backend_up(false);
        Self {
            primary: None,
            fallback,
            probe: Deadline::none(),
            deadline: Deadline::none(),
            metrics,
            last_up: AtomicBool::new(false),
        }
    }

    /// Build the backend chain described by `config`
    pub fn from_config(config: &WardenConfig, metrics: CacheMetrics) -> Result<Self> {
        let fallback = Arc::new(MemoryBackend::new());
        let probe = config.timeouts.probe().map_or(Deadline::none(), Deadline::after);
        let deadline = config.timeouts.cache().map_or(Deadline::none(), Deadline::after);

        if !config.primary.enabled {
            tracing::info!("Primary cache backend disabled, running memory-only");
            return Ok(Self::memory_only(fallback, metrics).with_deadlines(probe, deadline));
        }

        let namespaces = KeySpace::new(&config.key_prefix).namespace_patterns();
        let redis = RedisBackend::new(&config.primary.url, namespaces)?
            .with_deadlines(deadline, probe);
        tracing::info!(endpoint = %redis.endpoint(), "Using redis as primary cache backend");
        Ok(Self::new(Arc::new(redis), fallback, metrics).with_deadlines(probe, deadline))
    }

    pub fn with_deadlines(mut self, probe: Deadline, operation: Deadline) -> Self {
        self.probe = probe;
        self.deadline = operation;
        self
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn fallback(&self) -> &Arc<MemoryBackend> {
        &self.fallback
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn primary_kind(&self) -> Option<BackendKind> {
        self.primary.as_ref().map(|primary| primary.kind())
    }

    /// Probe the primary and update the backend gauge
    pub async fn probe_primary(&self) -> bool {
        let Some(primary) = &self.primary else {
            return false;
        };
        let up = self.probe.run(primary.ping()).await.unwrap_or(false);
        self.metrics.set_backend_up(up);

        let was_up = self.last_up.swap(up, Ordering::Relaxed);
        match (was_up, up) {
            (true, false) => tracing::warn!(
                backend = %primary.kind(),
                "Primary cache backend unavailable, routing to in-memory fallback"
            ),
            (false, true) => tracing::info!(
                backend = %primary.kind(),
                "Primary cache backend available"
            ),
            _ => {}
        }
        up
    }

    /// The primary, if it answers the probe
    async fn healthy_primary(&self) -> Option<&dyn CacheBackend> {
        match &self.primary {
            Some(primary) if self.probe_primary().await => Some(primary.as_ref()),
            _ => None,
        }
    }

    /// Run `op` against the selected backend, returning which kind served it.
    /// A primary that does not answer in time is treated as failed and the
    /// fallback answers instead.
    async fn route<'a, T, F, Fut>(&'a self, operation: &'static str, op: F) -> (BackendKind, T)
    where
        F: Fn(&'a dyn CacheBackend) -> Fut,
        Fut: Future<Output = T> + 'a,
    {
        let Some(primary) = self.healthy_primary().await else {
            return (BackendKind::Memory, op(self.fallback.as_ref()).await);
        };
        match self.deadline.run(op(primary)).await {
            Some(value) => (primary.kind(), value),
            None => {
                tracing::warn!(
                    operation,
                    "Primary cache backend timed out, using in-memory fallback"
                );
                self.metrics.record_operation(operation, "timeout");
                (BackendKind::Memory, op(self.fallback.as_ref()).await)
            }
        }
    }

    /// Run a removal on both tiers so a later outage cannot resurrect
    /// entries the primary already dropped
    async fn on_both<'a, T, F, Fut>(&'a self, operation: &'static str, op: F) -> (T, Option<T>)
    where
        F: Fn(&'a dyn CacheBackend) -> Fut,
        Fut: Future<Output = T> + 'a,
    {
        let local = op(self.fallback.as_ref()).await;
        let remote = match self.healthy_primary().await {
            Some(primary) => {
                let remote = self.deadline.run(op(primary)).await;
                if remote.is_none() {
                    tracing::warn!(operation, "Primary cache backend timed out");
                    self.metrics.record_operation(operation, "timeout");
                }
                remote
            }
            None => None,
        };
        (local, remote)
    }

    pub async fn stats(&self) -> BackendStats {
        let primary_up = self.probe_primary().await;
        let fallback_key_count = self.fallback.key_count().await;
        let (backend, key_count) = match &self.primary {
            Some(primary) if primary_up => (
                primary.kind(),
                self.deadline
                    .run(primary.key_count())
                    .await
                    .unwrap_or_default(),
            ),
            _ => (BackendKind::Memory, fallback_key_count),
        };
        BackendStats {
            backend,
            primary_configured: self.primary.is_some(),
            primary_up,
            key_count,
            fallback_key_count,
        }
    }
}

#[async_trait]
impl CacheBackend for TieredBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tiered
    }

    async fn get(&self, key: &str) -> Option<String> {
        let (kind, value) = self.route("get", |b| b.get(key)).await;
        match &value {
            Some(_) => {
                tracing::debug!(backend = %kind, key, "Cache hit");
                self.metrics.record_hit(kind.as_str());
            }
            None => {
                tracing::debug!(backend = %kind, key, "Cache miss");
                self.metrics.record_miss(kind.as_str());
            }
        }
        value
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let (_, ok) = self.route("set", |b| b.set(key, value, ttl_secs)).await;
        self.metrics
            .record_operation("set", if ok { "ok" } else { "failed" });
        ok
    }

    async fn delete(&self, key: &str) -> bool {
        let (local, remote) = self.on_both("delete", |b| b.delete(key)).await;
        let removed = local || remote.unwrap_or(false);
        self.metrics
            .record_operation("delete", if removed { "removed" } else { "absent" });
        removed
    }

    /// A configured primary that cannot be reached makes the removal
    /// `Failed` even when the fallback copy was dropped
    async fn remove(&self, key: &str) -> Removal {
        let (local, remote) = self.on_both("delete", |b| b.remove(key)).await;
        let removal = match &self.primary {
            Some(_) => local.merge(remote.unwrap_or(Removal::Failed)),
            None => local,
        };
        if removal == Removal::Failed {
            tracing::warn!(key, "Could not remove entry from the primary cache backend");
        }
        self.metrics.record_operation("delete", removal.as_str());
        removal
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        let (_, ok) = self.route("expire", |b| b.expire(key, ttl_secs)).await;
        ok
    }

    async fn delete_pattern(&self, pattern: &str) -> u64 {
        let (local, remote) = self
            .on_both("delete_pattern", |b| b.delete_pattern(pattern))
            .await;
        self.metrics.record_operation("delete_pattern", "ok");
        local + remote.unwrap_or(0)
    }

    async fn ttl(&self, key: &str) -> KeyTtl {
        self.route("ttl", |b| b.ttl(key)).await.1
    }

    async fn clear_all(&self) -> bool {
        let (local, remote) = self.on_both("clear_all", |b| b.clear_all()).await;
        let ok = match &self.primary {
            Some(_) => local && remote.unwrap_or(false),
            None => local,
        };
        self.metrics
            .record_operation("clear_all", if ok { "ok" } else { "failed" });
        ok
    }

    async fn ping(&self) -> bool {
        self.primary.is_none() || self.probe_primary().await
    }

    async fn key_count(&self) -> u64 {
        self.route("key_count", |b| b.key_count()).await.1
    }
}
