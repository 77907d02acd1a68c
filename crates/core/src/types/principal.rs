use crate::types::newtypes::PrincipalId;
use serde::{Deserialize, Serialize};

/// An authenticated actor as read from the permission store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

fn default_true() -> bool {
    true
}

impl Principal {
    /// An active, non-superuser principal
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        let id = id.into();
        Self {
            username: id.to_string(),
            id,
            is_active: true,
            is_superuser: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
