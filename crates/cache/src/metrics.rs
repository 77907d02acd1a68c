//! Prometheus metrics for the cache, the gate and invalidation
//!
//! Every metric here is a reporting side effect. Nothing reads them back to
//! make a decision.

use crate::errors::Result;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Process-wide metric handles, cheap to clone
#[derive(Clone)]
pub struct CacheMetrics {
    registry: Registry,
    /// 1 while the primary backend answers its health probe
    backend_up: IntGauge,
    /// Cache operations by operation and result
    operations: IntCounterVec,
    /// Cache hits by serving backend
    hits: IntCounterVec,
    /// Cache misses by serving backend
    misses: IntCounterVec,
    /// Authorization decisions by outcome
    decisions: IntCounterVec,
    /// Invalidations by scope and result
    invalidations: IntCounterVec,
}

impl CacheMetrics {
    /// Create the metric set on a fresh registry
    pub fn new() -> Result<Self> {
        Self::init(Registry::new())
    }

    /// Register the metric set on `registry`
    pub fn init(registry: Registry) -> Result<Self> {
        let backend_up = IntGauge::new(
            "warden_cache_backend_up",
            "Whether the primary cache backend answered its last health probe",
        )?;
        registry.register(Box::new(backend_up.clone()))?;

        let operations = IntCounterVec::new(
            Opts::new(
                "warden_cache_operations_total",
                "Total number of cache operations",
            ),
            &["operation", "result"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        let hits = IntCounterVec::new(
            Opts::new("warden_cache_hits_total", "Total number of cache hits"),
            &["backend"],
        )?;
        registry.register(Box::new(hits.clone()))?;

        let misses = IntCounterVec::new(
            Opts::new("warden_cache_misses_total", "Total number of cache misses"),
            &["backend"],
        )?;
        registry.register(Box::new(misses.clone()))?;

        let decisions = IntCounterVec::new(
            Opts::new(
                "warden_authz_decisions_total",
                "Total number of authorization decisions",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(decisions.clone()))?;

        let invalidations = IntCounterVec::new(
            Opts::new(
                "warden_invalidations_total",
                "Total number of cache invalidations",
            ),
            &["scope", "result"],
        )?;
        registry.register(Box::new(invalidations.clone()))?;

        Ok(Self {
            registry,
            backend_up,
            operations,
            hits,
            misses,
            decisions,
            invalidations,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn set_backend_up(&self, up: bool) {
        self.backend_up.set(i64::from(up));
    }

    pub fn backend_up(&self) -> bool {
        self.backend_up.get() == 1
    }

    pub fn record_operation(&self, operation: &str, result: &str) {
        self.operations
            .with_label_values(&[operation, result])
            .inc();
    }

    pub fn record_hit(&self, backend: &str) {
        self.record_operation("get", "hit");
        self.hits.with_label_values(&[backend]).inc();
    }

    pub fn record_miss(&self, backend: &str) {
        self.record_operation("get", "miss");
        self.misses.with_label_values(&[backend]).inc();
    }

    pub fn record_decision(&self, outcome: &str) {
        self.decisions.with_label_values(&[outcome]).inc();
    }

    pub fn record_invalidation(&self, scope: &str, result: &str) {
        self.invalidations.with_label_values(&[scope, result]).inc();
    }

    /// Counter value, mainly for tests and the `stats` command
    pub fn decision_count(&self, outcome: &str) -> u64 {
        self.decisions.with_label_values(&[outcome]).get()
    }

    pub fn operation_count(&self, operation: &str, result: &str) -> u64 {
        self.operations.with_label_values(&[operation, result]).get()
    }

    pub fn invalidation_count(&self, scope: &str, result: &str) -> u64 {
        self.invalidations.with_label_values(&[scope, result]).get()
    }

    pub fn hit_count(&self, backend: &str) -> u64 {
        self.hits.with_label_values(&[backend]).get()
    }

    pub fn miss_count(&self, backend: &str) -> u64 {
        self.misses.with_label_values(&[backend]).get()
    }

    /// Render every metric in the text exposition format
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
