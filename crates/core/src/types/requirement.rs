//! Requirement expressions evaluated by the authorization gate

use crate::errors::Result;
use crate::types::newtypes::PermissionCode;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// What a protected operation demands of the calling principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Requirement {
    /// One specific permission
    Single(PermissionCode),
    /// Every listed permission (AND)
    All(Vec<PermissionCode>),
    /// At least one listed permission (OR)
    Any(Vec<PermissionCode>),
    /// Membership of an active role, by name
    Role(String),
}

impl Requirement {
    pub fn single(code: &str) -> Result<Self> {
        Ok(Self::Single(PermissionCode::new(code)?))
    }

    pub fn all<'a>(codes: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        Ok(Self::All(parse_codes(codes)?))
    }

    pub fn any<'a>(codes: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        Ok(Self::Any(parse_codes(codes)?))
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::Role(name.into())
    }
}

fn parse_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> Result<Vec<PermissionCode>> {
    codes.into_iter().map(PermissionCode::new).collect()
}

impl Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |codes: &[PermissionCode], op: &str| {
            codes
                .iter()
                .map(PermissionCode::as_str)
                .collect::<Vec<_>>()
                .join(op)
        };
        match self {
            Self::Single(code) => write!(f, "{code}"),
            Self::All(codes) => write!(f, "all({})", join(codes, " AND ")),
            Self::Any(codes) => write!(f, "any({})", join(codes, " OR ")),
            Self::Role(name) => write!(f, "role({name})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_displays() {
        let req = Requirement::all(["doc:read", "doc:write"]).unwrap();
        assert_eq!(req.to_string(), "all(doc:read AND doc:write)");
        let req = Requirement::any(["doc:read", "report:export"]).unwrap();
        assert_eq!(req.to_string(), "any(doc:read OR report:export)");
        assert_eq!(Requirement::role("editor").to_string(), "role(editor)");
    }

    #[test]
    fn rejects_invalid_codes() {
        assert!(Requirement::single("nope").is_err());
        assert!(Requirement::all(["doc:read", "broken"]).is_err());
    }

    #[test]
    fn serializes_as_tagged_variant() {
        let req = Requirement::single("doc:read").unwrap();
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"kind":"single","value":"doc:read"}"#
        );
    }
}
