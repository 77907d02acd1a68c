//! Cache key layout
//!
//! Principal entries live at `<prefix>:<principal id>`. The two other
//! namespaces belong to derived caches that share the same backend and are
//! wiped together on a full reset.

use warden_config::Scenario;
use warden_core::constants::{PERMISSION_CACHE_NAMESPACE, ROLE_PERMISSIONS_NAMESPACE};
use warden_core::PrincipalId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches(':').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn principal_key(&self, principal: &PrincipalId) -> String {
        format!("{}:{}", self.prefix, principal)
    }

    /// Glob matching every principal entry
    pub fn principal_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }

    /// Globs covering everything a full reset removes
    pub fn namespace_patterns(&self) -> Vec<String> {
        vec![
            self.principal_pattern(),
            format!("{ROLE_PERMISSIONS_NAMESPACE}:*"),
            format!("{PERMISSION_CACHE_NAMESPACE}:*"),
        ]
    }

    /// Glob matching the entries written under `scenario`
    pub fn scenario_pattern(&self, scenario: Scenario) -> String {
        match scenario {
            Scenario::PrincipalPermissions => self.principal_pattern(),
            other => format!("*{other}*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_keys_use_prefix() {
        let keys = KeySpace::new("principal:permissions");
        assert_eq!(
            keys.principal_key(&PrincipalId::new("42")),
            "principal:permissions:42"
        );
        assert_eq!(keys.principal_pattern(), "principal:permissions:*");
    }

    #[test]
    fn trailing_separator_is_ignored() {
        let keys = KeySpace::new("tenant:perms:");
        assert_eq!(keys.principal_key(&PrincipalId::new("u")), "tenant:perms:u");
    }

    #[test]
    fn scenario_patterns() {
        let keys = KeySpace::new("principal:permissions");
        assert_eq!(
            keys.scenario_pattern(Scenario::PrincipalPermissions),
            "principal:permissions:*"
        );
        assert_eq!(
            keys.scenario_pattern(Scenario::DashboardData),
            "*dashboard_data*"
        );
        assert_eq!(keys.namespace_patterns().len(), 3);
    }
}
