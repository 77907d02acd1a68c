//! Operator-facing cache management
//!
//! Dynamic-TTL writes, TTL retuning of live entries, scenario clears and the
//! health/stats views. None of this is on the authorization path.

use crate::backend::{BackendKind, BackendStats, CacheBackend, KeyTtl, TieredBackend};
use crate::codec;
use crate::errors::Result;
use crate::keys::KeySpace;
use crate::ttl::{TtlContext, TtlPolicy, TtlPreview};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use warden_config::{PeakWindow, Scenario, ScenarioTtl};
use warden_core::PrincipalId;

/// Result of a dynamic-TTL write
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioWrite {
    pub key: String,
    pub scenario: Scenario,
    pub ttl_secs: u64,
    pub stored: bool,
}

/// One row of the scenario listing
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub scenario: Scenario,
    pub current_ttl: u64,
    pub table: ScenarioTtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub backend: BackendKind,
    pub primary_configured: bool,
    pub primary_up: bool,
}

/// Backend snapshot plus the TTL configuration in force
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    #[serde(flatten)]
    pub backend: BackendStats,
    pub key_prefix: String,
    pub base_ttl_secs: u64,
    pub peak_hours: Vec<PeakWindow>,
    pub scenarios: BTreeMap<Scenario, ScenarioTtl>,
}

pub struct CacheAdmin {
    backend: Arc<TieredBackend>,
    policy: Arc<TtlPolicy>,
    keys: KeySpace,
}

impl CacheAdmin {
    pub fn new(backend: Arc<TieredBackend>, policy: Arc<TtlPolicy>, keys: KeySpace) -> Self {
        Self {
            backend,
            policy,
            keys,
        }
    }

    /// Store `value` under `key` with the TTL `scenario` yields for `context`
    pub async fn set_with_scenario<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        scenario: Scenario,
        context: &TtlContext,
    ) -> Result<ScenarioWrite> {
        let raw = codec::encode(key, value)?;
        let ttl_secs = self.policy.ttl(scenario, context);
        let stored = self.backend.set(key, &raw, ttl_secs).await;
        tracing::debug!(key, %scenario, ttl = ttl_secs, stored, "Dynamic cache write");
        Ok(ScenarioWrite {
            key: key.to_string(),
            scenario,
            ttl_secs,
            stored,
        })
    }

    /// Reset the expiry of each live entry to the TTL for `context`, leaving
    /// values untouched. Absent keys map to `false`.
    pub async fn retune_ttl(
        &self,
        keys: &[String],
        scenario: Scenario,
        context: &TtlContext,
    ) -> BTreeMap<String, bool> {
        let ttl_secs = self.policy.ttl(scenario, context);
        let mut results = BTreeMap::new();
        for key in keys {
            let updated = self.backend.expire(key, ttl_secs).await;
            results.insert(key.clone(), updated);
        }
        tracing::info!(
            %scenario,
            ttl = ttl_secs,
            updated = results.values().filter(|ok| **ok).count(),
            requested = keys.len(),
            "Retuned cache entry TTLs"
        );
        results
    }

    /// Retune the permission entry of one principal
    pub async fn retune_principal_ttl(&self, principal: &PrincipalId, context: &TtlContext) -> bool {
        let key = self.keys.principal_key(principal);
        self.retune_ttl(&[key], Scenario::PrincipalPermissions, context)
            .await
            .into_values()
            .next()
            .unwrap_or(false)
    }

    pub fn ttl_preview(&self, scenario: Scenario, context: &TtlContext) -> TtlPreview {
        self.policy.preview(scenario, context)
    }

    /// Every configured scenario with the TTL it currently yields
    pub fn scenarios(&self, context: &TtlContext) -> Vec<ScenarioSummary> {
        self.policy
            .tables()
            .iter()
            .map(|(scenario, table)| ScenarioSummary {
                scenario: *scenario,
                current_ttl: self.policy.ttl(*scenario, context),
                table: table.clone(),
            })
            .collect()
    }

    /// Remove every entry written under `scenario`
    pub async fn clear_scenario(&self, scenario: Scenario) -> u64 {
        let pattern = self.keys.scenario_pattern(scenario);
        let removed = self.backend.delete_pattern(&pattern).await;
        tracing::info!(%scenario, pattern = %pattern, removed, "Cleared scenario cache");
        removed
    }

    pub async fn key_ttl(&self, key: &str) -> KeyTtl {
        self.backend.ttl(key).await
    }

    /// Drop expired fallback entries
    pub fn purge_expired(&self) -> usize {
        self.backend.fallback().purge_expired()
    }

    pub async fn health(&self) -> HealthReport {
        let primary_up = self.backend.probe_primary().await;
        let (status, backend) = match self.backend.primary_kind() {
            Some(kind) if primary_up => (HealthStatus::Healthy, kind),
            Some(_) => (HealthStatus::Degraded, BackendKind::Memory),
            None => (HealthStatus::Healthy, BackendKind::Memory),
        };
        HealthReport {
            status,
            backend,
            primary_configured: self.backend.has_primary(),
            primary_up,
        }
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.backend.stats().await,
            key_prefix: self.keys.prefix().to_string(),
            base_ttl_secs: self.policy.base_ttl_secs(),
            peak_hours: self.policy.peak_hours().to_vec(),
            scenarios: self.policy.tables().clone(),
        }
    }

    pub fn metrics_text(&self) -> String {
        self.backend.metrics().gather_text()
    }
}
