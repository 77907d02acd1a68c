//! Authorization decisions and their machine-readable reasons

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Outcome of a single authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(reason),
        }
    }
}

/// Why a check was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyKind {
    /// The principal is deactivated
    Inactive,
    /// A single required permission is absent
    MissingPermission,
    /// Some permissions of an ALL requirement are absent
    MissingAllOf,
    /// None of the permissions of an ANY requirement are present
    MissingAnyOf,
    /// The principal does not hold the role
    MissingRole,
}

/// Kind plus the exact codes or roles that were missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyReason {
    pub kind: DenyKind,
    pub missing: Vec<String>,
}

impl DenyReason {
    pub fn new(kind: DenyKind, missing: Vec<String>) -> Self {
        Self { kind, missing }
    }

    pub fn inactive() -> Self {
        Self::new(DenyKind::Inactive, Vec::new())
    }
}

impl Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = self.missing.join(", ");
        match self.kind {
            DenyKind::Inactive => write!(f, "principal is inactive"),
            DenyKind::MissingPermission => write!(f, "missing permission: {missing}"),
            DenyKind::MissingAllOf => write!(f, "missing required permissions: {missing}"),
            DenyKind::MissingAnyOf => write!(f, "requires any of: {missing}"),
            DenyKind::MissingRole => write!(f, "missing role: {missing}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_reason_renders_missing_codes() {
        let reason = DenyReason::new(DenyKind::MissingAllOf, vec!["admin:delete".into()]);
        assert_eq!(reason.to_string(), "missing required permissions: admin:delete");
        assert_eq!(DenyReason::inactive().to_string(), "principal is inactive");
    }

    #[test]
    fn decision_serializes_with_reason() {
        let decision = Decision::Deny(DenyReason::new(
            DenyKind::MissingRole,
            vec!["editor".into()],
        ));
        assert_eq!(
            serde_json::to_string(&decision).unwrap(),
            r#"{"decision":"deny","reason":{"kind":"missing_role","missing":["editor"]}}"#
        );
        assert!(!decision.is_allowed());
        assert!(Decision::Allow.deny_reason().is_none());
    }
}
