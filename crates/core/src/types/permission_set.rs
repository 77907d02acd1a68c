//! Effective permission sets

use crate::constants::WILDCARD_PERMISSION;
use crate::errors::{Error, Result};
use crate::types::newtypes::PermissionCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The effective permissions of a principal.
///
/// `All` is the superuser sentinel. It is never written to the cache: the
/// resolver answers it without touching any backend. On the wire it is the
/// single code `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum PermissionSet {
    All,
    Codes(BTreeSet<PermissionCode>),
}

impl PermissionSet {
    pub fn empty() -> Self {
        Self::Codes(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn contains(&self, code: &str) -> bool {
        match self {
            Self::All => true,
            Self::Codes(codes) => codes.contains(code),
        }
    }

    /// Codes from `required` that this set does not grant, in input order
    pub fn missing<'a>(
        &self,
        required: impl IntoIterator<Item = &'a PermissionCode>,
    ) -> Vec<PermissionCode> {
        required
            .into_iter()
            .filter(|code| !self.contains(code.as_str()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::All => 1,
            Self::Codes(codes) => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Codes(codes) if codes.is_empty())
    }

    /// Sorted codes as plain strings; `["*"]` for the wildcard
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::All => vec![WILDCARD_PERMISSION.to_string()],
            Self::Codes(codes) => codes.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionCode>>(iter: I) -> Self {
        Self::Codes(iter.into_iter().collect())
    }
}

impl From<PermissionSet> for Vec<String> {
    fn from(set: PermissionSet) -> Self {
        set.to_strings()
    }
}

impl TryFrom<Vec<String>> for PermissionSet {
    type Error = Error;

    fn try_from(raw: Vec<String>) -> Result<Self> {
        if raw.iter().any(|c| c == WILDCARD_PERMISSION) {
            return Ok(Self::All);
        }
        raw.into_iter().map(PermissionCode::new).collect()
    }
}
