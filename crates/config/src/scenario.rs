//! Cache scenarios, context flags and their TTL tables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use warden_core::Error;

/// A category of cached computation; each has its own TTL table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    PrincipalPermissions,
    RolePermissions,
    MenuPermissions,
    ProfileData,
    SystemConfig,
    DashboardData,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::PrincipalPermissions,
        Scenario::RolePermissions,
        Scenario::MenuPermissions,
        Scenario::ProfileData,
        Scenario::SystemConfig,
        Scenario::DashboardData,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrincipalPermissions => "principal_permissions",
            Self::RolePermissions => "role_permissions",
            Self::MenuPermissions => "menu_permissions",
            Self::ProfileData => "profile_data",
            Self::SystemConfig => "system_config",
            Self::DashboardData => "dashboard_data",
        }
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| Error::configuration(format!("unknown cache scenario '{s}'")))
    }
}

/// A boolean signal in a TTL context that may override a scenario's TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextFlag {
    RoleChanged,
    ProfileUpdated,
    ConfigUpdated,
    DataUpdated,
    RealTime,
    HighLoad,
    AdminActive,
}

impl ContextFlag {
    /// Precedence order when several flags are set at once.
    ///
    /// The derived `Ord` follows declaration order, which is this order.
    pub const PRECEDENCE: [ContextFlag; 7] = [
        ContextFlag::RoleChanged,
        ContextFlag::ProfileUpdated,
        ContextFlag::ConfigUpdated,
        ContextFlag::DataUpdated,
        ContextFlag::RealTime,
        ContextFlag::HighLoad,
        ContextFlag::AdminActive,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoleChanged => "role_changed",
            Self::ProfileUpdated => "profile_updated",
            Self::ConfigUpdated => "config_updated",
            Self::DataUpdated => "data_updated",
            Self::RealTime => "real_time",
            Self::HighLoad => "high_load",
            Self::AdminActive => "admin_active",
        }
    }
}

impl Display for ContextFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRECEDENCE
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| Error::configuration(format!("unknown context flag '{s}'")))
    }
}

/// TTL table of one scenario, in seconds. Missing entries fall back to the
/// global base TTL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioTtl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<ContextFlag, u64>,
}

impl ScenarioTtl {
    pub fn new(normal: u64, peak: u64) -> Self {
        Self {
            normal: Some(normal),
            peak: Some(peak),
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, flag: ContextFlag, secs: u64) -> Self {
        self.overrides.insert(flag, secs);
        self
    }

    /// Every configured value, for validation
    pub(crate) fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.normal
            .into_iter()
            .chain(self.peak)
            .chain(self.overrides.values().copied())
    }
}

/// Built-in scenario tables
pub fn default_scenario_tables() -> BTreeMap<Scenario, ScenarioTtl> {
    use ContextFlag::*;

    BTreeMap::from([
        (
            Scenario::PrincipalPermissions,
            ScenarioTtl::new(1800, 900)
                .with_override(RoleChanged, 300)
                .with_override(AdminActive, 600),
        ),
        (
            Scenario::RolePermissions,
            ScenarioTtl::new(3600, 1800).with_override(RoleChanged, 300),
        ),
        (
            Scenario::MenuPermissions,
            ScenarioTtl::new(3600, 1800).with_override(RoleChanged, 300),
        ),
        (
            Scenario::ProfileData,
            ScenarioTtl::new(1800, 900).with_override(ProfileUpdated, 60),
        ),
        (
            Scenario::SystemConfig,
            ScenarioTtl::new(7200, 3600).with_override(ConfigUpdated, 60),
        ),
        (
            Scenario::DashboardData,
            ScenarioTtl::new(300, 120)
                .with_override(DataUpdated, 30)
                .with_override(RealTime, 10)
                .with_override(HighLoad, 600),
        ),
    ])
}
