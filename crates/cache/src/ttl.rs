//! Scenario-driven TTL policy
//!
//! `TtlPolicy::ttl` is a pure function of the configured tables, the context
//! flags and the hour carried by the context. Reading the clock happens only
//! in [`TtlContext::now`].

use chrono::Timelike;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use warden_config::{ContextFlag, PeakWindow, Scenario, ScenarioTtl, WardenConfig};

/// Flags and wall-clock hour used to pick a TTL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TtlContext {
    /// Ordered by precedence
    pub flags: BTreeSet<ContextFlag>,
    /// Local hour, `0..=23`
    pub hour: u8,
}

impl TtlContext {
    /// No flags, current local hour
    pub fn now() -> Self {
        let hour = chrono::Local::now().hour();
        Self::at_hour(u8::try_from(hour).unwrap_or_default())
    }

    pub fn at_hour(hour: u8) -> Self {
        Self {
            flags: BTreeSet::new(),
            hour: hour % 24,
        }
    }

    pub fn with_flag(mut self, flag: ContextFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = ContextFlag>) -> Self {
        self.flags.extend(flags);
        self
    }
}

/// Which rule produced a TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "flag")]
pub enum TtlSource {
    Override(ContextFlag),
    Peak,
    Normal,
    Base,
}

/// A computed TTL with the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtlDecision {
    pub secs: u64,
    pub source: TtlSource,
}

/// Side-by-side view of a scenario's TTL with and without a context
#[derive(Debug, Clone, Serialize)]
pub struct TtlPreview {
    pub scenario: Scenario,
    pub normal: TtlDecision,
    pub context: TtlDecision,
    pub is_peak: bool,
    pub table: Option<ScenarioTtl>,
}

/// Immutable TTL tables, built once at startup
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    base_ttl_secs: u64,
    peak_hours: Vec<PeakWindow>,
    tables: BTreeMap<Scenario, ScenarioTtl>,
}

impl TtlPolicy {
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            base_ttl_secs: config.base_ttl_secs,
            peak_hours: config.peak_hours.clone(),
            tables: config.scenarios.clone(),
        }
    }

    pub fn base_ttl_secs(&self) -> u64 {
        self.base_ttl_secs
    }

    pub fn peak_hours(&self) -> &[PeakWindow] {
        &self.peak_hours
    }

    pub fn table(&self, scenario: Scenario) -> Option<&ScenarioTtl> {
        self.tables.get(&scenario)
    }

    pub fn tables(&self) -> &BTreeMap<Scenario, ScenarioTtl> {
        &self.tables
    }

    pub fn is_peak_hour(&self, hour: u8) -> bool {
        self.peak_hours.iter().any(|window| window.contains(hour))
    }

    /// Seconds to keep an entry of `scenario` written under `context`
    pub fn ttl(&self, scenario: Scenario, context: &TtlContext) -> u64 {
        self.decide(scenario, context).secs
    }

    pub fn decide(&self, scenario: Scenario, context: &TtlContext) -> TtlDecision {
        let base = TtlDecision {
            secs: self.base_ttl_secs,
            source: TtlSource::Base,
        };
        let Some(table) = self.tables.get(&scenario) else {
            return base;
        };

        if let Some((flag, secs)) = context
            .flags
            .iter()
            .find_map(|flag| table.overrides.get(flag).map(|secs| (*flag, *secs)))
        {
            return TtlDecision {
                secs,
                source: TtlSource::Override(flag),
            };
        }

        let (entry, source) = if self.is_peak_hour(context.hour) {
            (table.peak, TtlSource::Peak)
        } else {
            (table.normal, TtlSource::Normal)
        };
        entry.map_or(base, |secs| TtlDecision { secs, source })
    }

    pub fn preview(&self, scenario: Scenario, context: &TtlContext) -> TtlPreview {
        TtlPreview {
            scenario,
            normal: self.decide(scenario, &TtlContext::at_hour(context.hour)),
            context: self.decide(scenario, context),
            is_peak: self.is_peak_hour(context.hour),
            table: self.tables.get(&scenario).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> TtlPolicy {
        TtlPolicy::from_config(&WardenConfig::default())
    }

    #[test]
    fn normal_and_peak_hours() {
        let policy = policy();
        let scenario = Scenario::PrincipalPermissions;
        assert_eq!(policy.ttl(scenario, &TtlContext::at_hour(8)), 1800);
        assert_eq!(policy.ttl(scenario, &TtlContext::at_hour(9)), 900);
        assert_eq!(policy.ttl(scenario, &TtlContext::at_hour(12)), 1800);
        assert_eq!(policy.ttl(scenario, &TtlContext::at_hour(17)), 900);
        assert_eq!(policy.ttl(scenario, &TtlContext::at_hour(18)), 1800);
    }

    #[test]
    fn role_changed_wins_regardless_of_hour() {
        let policy = policy();
        for hour in 0..24 {
            let context = TtlContext::at_hour(hour).with_flag(ContextFlag::RoleChanged);
            let decision = policy.decide(Scenario::PrincipalPermissions, &context);
            assert_eq!(decision.secs, 300);
            assert_eq!(decision.source, TtlSource::Override(ContextFlag::RoleChanged));
        }
    }

    #[test]
    fn flags_without_table_entry_are_ignored() {
        let policy = policy();
        let context = TtlContext::at_hour(3).with_flag(ContextFlag::RealTime);
        assert_eq!(policy.ttl(Scenario::SystemConfig, &context), 7200);
    }

    #[test]
    fn first_flag_in_precedence_order_wins() {
        let policy = policy();
        let context = TtlContext::at_hour(3)
            .with_flag(ContextFlag::HighLoad)
            .with_flag(ContextFlag::RealTime);
        assert_eq!(policy.ttl(Scenario::DashboardData, &context), 10);

        let context = TtlContext::at_hour(3)
            .with_flag(ContextFlag::AdminActive)
            .with_flag(ContextFlag::RoleChanged);
        assert_eq!(policy.ttl(Scenario::PrincipalPermissions, &context), 300);
    }

    #[test]
    fn undefined_entries_fall_back_to_base() {
        let config = WardenConfig::builder()
            .with_base_ttl(42)
            .without_scenario(Scenario::MenuPermissions)
            .with_scenario(
                Scenario::ProfileData,
                ScenarioTtl {
                    normal: Some(100),
                    ..ScenarioTtl::default()
                },
            )
            .build()
            .unwrap();
        let policy = TtlPolicy::from_config(&config);

        let decision = policy.decide(Scenario::MenuPermissions, &TtlContext::at_hour(3));
        assert_eq!(decision, TtlDecision { secs: 42, source: TtlSource::Base });
        assert_eq!(policy.ttl(Scenario::ProfileData, &TtlContext::at_hour(3)), 100);
        assert_eq!(policy.ttl(Scenario::ProfileData, &TtlContext::at_hour(10)), 42);
    }

    #[test]
    fn preview_reports_both_sides() {
        let policy = policy();
        let context = TtlContext::at_hour(10).with_flag(ContextFlag::DataUpdated);
        let preview = policy.preview(Scenario::DashboardData, &context);
        assert!(preview.is_peak);
        assert_eq!(preview.normal.secs, 120);
        assert_eq!(preview.context.secs, 30);
        assert!(preview.table.is_some());
    }

    #[test]
    fn now_is_a_valid_hour() {
        assert!(TtlContext::now().hour < 24);
    }

    fn freshness_flags() -> impl Strategy<Value = ContextFlag> {
        prop_oneof![
            Just(ContextFlag::RoleChanged),
            Just(ContextFlag::ProfileUpdated),
            Just(ContextFlag::ConfigUpdated),
            Just(ContextFlag::DataUpdated),
            Just(ContextFlag::RealTime),
        ]
    }

    proptest! {
        #[test]
        fn freshness_overrides_never_exceed_normal(
            flag in freshness_flags(),
            hour in 0u8..24,
            index in 0usize..Scenario::ALL.len(),
        ) {
            let policy = policy();
            let scenario = Scenario::ALL[index];
            let table = policy.table(scenario).unwrap();
            let context = TtlContext::at_hour(hour).with_flag(flag);
            let decision = policy.decide(scenario, &context);
            if let TtlSource::Override(_) = decision.source {
                prop_assert!(decision.secs <= table.normal.unwrap());
            }
        }

        #[test]
        fn ttl_is_always_positive(hour in 0u8..24, index in 0usize..Scenario::ALL.len()) {
            let policy = policy();
            prop_assert!(policy.ttl(Scenario::ALL[index], &TtlContext::at_hour(hour)) > 0);
        }
    }
}
