//! Newtype wrappers for identifiers and permission codes

use crate::constants::PERMISSION_SEPARATOR;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Opaque identity of an authenticated principal
    PrincipalId
);
opaque_id!(
    /// Opaque identity of a role
    RoleId
);
opaque_id!(
    /// Opaque identity of a permission record
    PermissionId
);

/// A validated permission code of the form `resource:action`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Create a new PermissionCode with validation
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let Some((resource, action)) = code.split_once(PERMISSION_SEPARATOR) else {
            return Err(Error::invalid_permission_code(
                code,
                "expected the form resource:action",
            ));
        };
        if resource.is_empty() || action.is_empty() {
            return Err(Error::invalid_permission_code(
                code,
                "resource and action must both be non-empty",
            ));
        }
        let valid_char = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':');
        if !code.chars().all(valid_char) {
            return Err(Error::invalid_permission_code(
                code,
                "only alphanumerics, '_', '-', '.' and ':' are allowed",
            ));
        }
        Ok(Self(code))
    }

    /// Create a PermissionCode without validation (input already validated)
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `resource` half of the code
    pub fn resource(&self) -> &str {
        self.0
            .split_once(PERMISSION_SEPARATOR)
            .map_or(self.0.as_str(), |(resource, _)| resource)
    }

    /// The `action` half of the code
    pub fn action(&self) -> &str {
        self.0
            .split_once(PERMISSION_SEPARATOR)
            .map_or("", |(_, action)| action)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for PermissionCode {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Ordering and hashing are those of the inner string, so lookups by `&str`
// agree with lookups by code.
impl Borrow<str> for PermissionCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for PermissionCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PermissionCode {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.0
    }
}
