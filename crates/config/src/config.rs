//! Centralized configuration for warden
//!
//! `WardenConfig` is immutable after construction and cheap to clone. It is
//! handed to the cache, TTL policy and resolver constructors explicitly.

use crate::scenario::{default_scenario_tables, Scenario, ScenarioTtl};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use warden_core::constants::{DEFAULT_BASE_TTL_SECS, DEFAULT_KEY_PREFIX, DEFAULT_REDIS_URL};
use warden_core::{Error, Result};

/// Complete configuration of the resolver/cache/gate triad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// TTL used when a scenario or an entry of its table is undefined
    pub base_ttl_secs: u64,
    /// Peak-hour windows, half-open `[start, end)` in local hours
    pub peak_hours: Vec<PeakWindow>,
    /// Namespace of principal permission cache keys
    pub key_prefix: String,
    /// Distributed primary backend
    pub primary: PrimaryConfig,
    /// Deadlines for I/O bound calls
    pub timeouts: TimeoutConfig,
    /// Period of the fallback purge task; zero disables it
    pub purge_interval_secs: u64,
    /// Per-scenario TTL tables
    pub scenarios: BTreeMap<Scenario, ScenarioTtl>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            base_ttl_secs: DEFAULT_BASE_TTL_SECS,
            peak_hours: vec![PeakWindow::new(9, 12), PeakWindow::new(14, 18)],
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            primary: PrimaryConfig::default(),
            timeouts: TimeoutConfig::default(),
            purge_interval_secs: 60,
            scenarios: default_scenario_tables(),
        }
    }
}

impl WardenConfig {
    pub fn builder() -> WardenConfigBuilder {
        WardenConfigBuilder::new()
    }

    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_secs > 0).then(|| Duration::from_secs(self.purge_interval_secs))
    }

    /// Reject configurations that would make the TTL engine misbehave
    pub fn validate(&self) -> Result<()> {
        if self.base_ttl_secs == 0 {
            return Err(Error::configuration("base_ttl_secs must be greater than zero"));
        }
        if self.key_prefix.trim().is_empty() {
            return Err(Error::configuration("key_prefix must not be empty"));
        }
        for window in &self.peak_hours {
            if window.start >= window.end || window.end > 24 {
                return Err(Error::configuration(format!(
                    "invalid peak window [{}, {}): start must be before end and end at most 24",
                    window.start, window.end
                )));
            }
        }
        for (scenario, table) in &self.scenarios {
            if table.values().any(|secs| secs == 0) {
                return Err(Error::configuration(format!(
                    "scenario '{scenario}' has a zero TTL entry"
                )));
            }
        }
        if self.primary.enabled && self.primary.url.trim().is_empty() {
            return Err(Error::configuration(
                "primary backend is enabled but no url is configured",
            ));
        }
        Ok(())
    }
}

/// A half-open hour interval, serialized as `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u8, u8)", into = "(u8, u8)")]
pub struct PeakWindow {
    pub start: u8,
    pub end: u8,
}

impl PeakWindow {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub const fn contains(&self, hour: u8) -> bool {
        self.start <= hour && hour < self.end
    }
}

impl From<(u8, u8)> for PeakWindow {
    fn from((start, end): (u8, u8)) -> Self {
        Self { start, end }
    }
}

impl From<PeakWindow> for (u8, u8) {
    fn from(window: PeakWindow) -> Self {
        (window.start, window.end)
    }
}

/// Settings of the distributed primary backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// When false the process runs in memory-only mode
    pub enabled: bool,
    pub url: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

/// Deadlines in milliseconds; zero means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub cache_ms: u64,
    pub probe_ms: u64,
    pub store_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cache_ms: 250,
            probe_ms: 100,
            store_ms: 2000,
        }
    }
}

impl TimeoutConfig {
    pub fn cache(&self) -> Option<Duration> {
        non_zero_millis(self.cache_ms)
    }

    pub fn probe(&self) -> Option<Duration> {
        non_zero_millis(self.probe_ms)
    }

    pub fn store(&self) -> Option<Duration> {
        non_zero_millis(self.store_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for creating warden configurations
pub struct WardenConfigBuilder {
    config: WardenConfig,
}

impl WardenConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: WardenConfig::default(),
        }
    }

    pub fn with_base_ttl(mut self, secs: u64) -> Self {
        self.config.base_ttl_secs = secs;
        self
    }

    pub fn with_peak_hours(mut self, windows: Vec<PeakWindow>) -> Self {
        self.config.peak_hours = windows;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Enable the distributed primary backend at `url`
    pub fn with_primary(mut self, url: impl Into<String>) -> Self {
        self.config.primary = PrimaryConfig {
            enabled: true,
            url: url.into(),
        };
        self
    }

    /// Run with the in-process fallback backend only
    pub fn memory_only(mut self) -> Self {
        self.config.primary.enabled = false;
        self
    }

    pub fn with_scenario(mut self, scenario: Scenario, table: ScenarioTtl) -> Self {
        self.config.scenarios.insert(scenario, table);
        self
    }

    pub fn without_scenario(mut self, scenario: Scenario) -> Self {
        self.config.scenarios.remove(&scenario);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    pub fn with_purge_interval(mut self, secs: u64) -> Self {
        self.config.purge_interval_secs = secs;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<WardenConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for WardenConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ContextFlag;

    #[test]
    fn defaults_are_valid() {
        let config = WardenConfig::default();
        config.validate().unwrap();
        assert_eq!(config.base_ttl_secs, 1800);
        assert_eq!(config.key_prefix, "principal:permissions");
        assert!(!config.primary.enabled);
        assert_eq!(config.scenarios.len(), Scenario::ALL.len());
        assert_eq!(config.purge_interval(), Some(Duration::from_secs(60)));
        assert_eq!(
            WardenConfig::builder().with_purge_interval(0).build().unwrap().purge_interval(),
            None
        );
    }

    #[test]
    fn peak_windows_are_half_open() {
        let window = PeakWindow::new(9, 12);
        assert!(!window.contains(8));
        assert!(window.contains(9));
        assert!(window.contains(11));
        assert!(!window.contains(12));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(WardenConfig::builder().with_base_ttl(0).build().is_err());
        assert!(WardenConfig::builder().with_key_prefix("  ").build().is_err());
        assert!(WardenConfig::builder()
            .with_peak_hours(vec![PeakWindow::new(12, 9)])
            .build()
            .is_err());
        assert!(WardenConfig::builder()
            .with_peak_hours(vec![PeakWindow::new(20, 25)])
            .build()
            .is_err());
        assert!(WardenConfig::builder()
            .with_scenario(
                Scenario::ProfileData,
                ScenarioTtl::new(60, 30).with_override(ContextFlag::ProfileUpdated, 0),
            )
            .build()
            .is_err());
        assert!(WardenConfig::builder().with_primary("").build().is_err());
    }

    #[test]
    fn serializes_peak_windows_as_pairs() {
        let json = serde_json::to_value(WardenConfig::default()).unwrap();
        assert_eq!(json["peak_hours"], serde_json::json!([[9, 12], [14, 18]]));
    }

    #[test]
    fn zero_timeouts_mean_unbounded() {
        let timeouts = TimeoutConfig {
            cache_ms: 0,
            probe_ms: 10,
            store_ms: 0,
        };
        assert_eq!(timeouts.cache(), None);
        assert_eq!(timeouts.probe(), Some(Duration::from_millis(10)));
        assert_eq!(timeouts.store(), None);
    }
}
