//! In-memory permission store
//!
//! Backs the tests and the `check` command. Mutations only change the store;
//! pair them with the matching invalidation, as a real store would.

use crate::store::PermissionStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use warden_core::{
    Error, PermissionCode, PermissionId, Principal, PrincipalId, Result, ResultExt, RoleId,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub code: PermissionCode,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub permissions: BTreeSet<PermissionId>,
}

/// A principal with its grants, as written in a fixture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalFixture {
    #[serde(flatten)]
    pub principal: Principal,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    #[serde(default)]
    pub permissions: BTreeSet<PermissionId>,
}

/// Serialized form of a whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub principals: Vec<PrincipalFixture>,
}

#[derive(Debug, Default)]
struct StoreState {
    principals: BTreeMap<PrincipalId, Principal>,
    permissions: BTreeMap<PermissionId, PermissionRecord>,
    roles: BTreeMap<RoleId, RoleRecord>,
    direct: BTreeMap<PrincipalId, BTreeSet<PermissionId>>,
    memberships: BTreeMap<PrincipalId, BTreeSet<RoleId>>,
}

impl StoreState {
    fn active_code(&self, id: &PermissionId) -> Option<PermissionCode> {
        self.permissions
            .get(id)
            .filter(|permission| permission.is_active)
            .map(|permission| permission.code.clone())
    }

    fn active_roles<'a>(&'a self, principal: &PrincipalId) -> impl Iterator<Item = &'a RoleRecord> {
        self.memberships
            .get(principal)
            .into_iter()
            .flatten()
            .filter_map(|role| self.roles.get(role))
            .filter(|role| role.is_active)
    }

    fn require_principal(&self, principal: &PrincipalId) -> Result<()> {
        if self.principals.contains_key(principal) {
            Ok(())
        } else {
            Err(Error::principal_not_found(principal.as_str()))
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a fixture, rejecting dangling references
    pub fn from_fixture(fixture: StoreFixture) -> Result<Self> {
        let store = Self::new();
        for permission in fixture.permissions {
            store.upsert_permission(permission);
        }
        for role in fixture.roles {
            store.upsert_role(role)?;
        }
        for entry in fixture.principals {
            let id = entry.principal.id.clone();
            store.upsert_principal(entry.principal);
            for role in &entry.roles {
                store.assign_role(&id, role)?;
            }
            for permission in &entry.permissions {
                store.grant_direct(&id, permission)?;
            }
        }
        Ok(store)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let fixture: StoreFixture =
            serde_json::from_str(raw).context("failed to parse store fixture")?;
        Self::from_fixture(fixture)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store fixture '{}'", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn upsert_principal(&self, principal: Principal) {
        self.state
            .write()
            .principals
            .insert(principal.id.clone(), principal);
    }

    pub fn upsert_permission(&self, permission: PermissionRecord) {
        self.state
            .write()
            .permissions
            .insert(permission.id.clone(), permission);
    }

    /// Insert or replace a role. Every permission it lists must exist.
    pub fn upsert_role(&self, role: RoleRecord) -> Result<()> {
        let mut state = self.state.write();
        if let Some(unknown) = role
            .permissions
            .iter()
            .find(|id| !state.permissions.contains_key(*id))
        {
            return Err(Error::configuration(format!(
                "role '{}' references unknown permission '{unknown}'",
                role.id
            )));
        }
        state.roles.insert(role.id.clone(), role);
        Ok(())
    }

    pub fn delete_role(&self, role: &RoleId) -> bool {
        let mut state = self.state.write();
        for roles in state.memberships.values_mut() {
            roles.remove(role);
        }
        state.roles.remove(role).is_some()
    }

    pub fn grant_direct(&self, principal: &PrincipalId, permission: &PermissionId) -> Result<()> {
        let mut state = self.state.write();
        state.require_principal(principal)?;
        if !state.permissions.contains_key(permission) {
            return Err(Error::configuration(format!(
                "unknown permission '{permission}'"
            )));
        }
        state
            .direct
            .entry(principal.clone())
            .or_default()
            .insert(permission.clone());
        Ok(())
    }

    pub fn revoke_direct(&self, principal: &PrincipalId, permission: &PermissionId) -> bool {
        self.state
            .write()
            .direct
            .get_mut(principal)
            .is_some_and(|grants| grants.remove(permission))
    }

    pub fn assign_role(&self, principal: &PrincipalId, role: &RoleId) -> Result<()> {
        let mut state = self.state.write();
        state.require_principal(principal)?;
        if !state.roles.contains_key(role) {
            return Err(Error::configuration(format!("unknown role '{role}'")));
        }
        state
            .memberships
            .entry(principal.clone())
            .or_default()
            .insert(role.clone());
        Ok(())
    }

    pub fn unassign_role(&self, principal: &PrincipalId, role: &RoleId) -> bool {
        self.state
            .write()
            .memberships
            .get_mut(principal)
            .is_some_and(|roles| roles.remove(role))
    }

    pub fn set_role_permissions(
        &self,
        role: &RoleId,
        permissions: impl IntoIterator<Item = PermissionId>,
    ) -> Result<()> {
        let existing = self
            .state
            .read()
            .roles
            .get(role)
            .cloned()
            .ok_or_else(|| Error::configuration(format!("unknown role '{role}'")))?;
        self.upsert_role(RoleRecord {
            permissions: permissions.into_iter().collect(),
            ..existing
        })
    }

    pub fn set_role_active(&self, role: &RoleId, active: bool) -> Result<()> {
        let mut state = self.state.write();
        let record = state
            .roles
            .get_mut(role)
            .ok_or_else(|| Error::configuration(format!("unknown role '{role}'")))?;
        record.is_active = active;
        Ok(())
    }

    pub fn set_permission_active(&self, permission: &PermissionId, active: bool) -> Result<()> {
        let mut state = self.state.write();
        let record = state
            .permissions
            .get_mut(permission)
            .ok_or_else(|| Error::configuration(format!("unknown permission '{permission}'")))?;
        record.is_active = active;
        Ok(())
    }

    pub fn set_principal_active(&self, principal: &PrincipalId, active: bool) -> Result<()> {
        let mut state = self.state.write();
        let record = state
            .principals
            .get_mut(principal)
            .ok_or_else(|| Error::principal_not_found(principal.as_str()))?;
        record.is_active = active;
        Ok(())
    }

    pub fn principal_ids(&self) -> Vec<PrincipalId> {
        self.state.read().principals.keys().cloned().collect()
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn get_principal(&self, principal: &PrincipalId) -> Result<Principal> {
        self.state
            .read()
            .principals
            .get(principal)
            .cloned()
            .ok_or_else(|| Error::principal_not_found(principal.as_str()))
    }

    async fn direct_grants(&self, principal: &PrincipalId) -> Result<BTreeSet<PermissionCode>> {
        let state = self.state.read();
        state.require_principal(principal)?;
        Ok(state
            .direct
            .get(principal)
            .into_iter()
            .flatten()
            .filter_map(|id| state.active_code(id))
            .collect())
    }

    async fn role_grants(&self, principal: &PrincipalId) -> Result<BTreeSet<PermissionCode>> {
        let state = self.state.read();
        state.require_principal(principal)?;
        Ok(state
            .active_roles(principal)
            .flat_map(|role| role.permissions.iter())
            .filter_map(|id| state.active_code(id))
            .collect())
    }

    async fn principals_by_role(&self, role: &RoleId) -> Result<Vec<PrincipalId>> {
        let state = self.state.read();
        Ok(state
            .memberships
            .iter()
            .filter(|(_, roles)| roles.contains(role))
            .map(|(principal, _)| principal.clone())
            .collect())
    }

    async fn principals_by_permission(
        &self,
        permission: &PermissionId,
    ) -> Result<Vec<PrincipalId>> {
        let state = self.state.read();
        let via_roles: BTreeSet<&RoleId> = state
            .roles
            .values()
            .filter(|role| role.permissions.contains(permission))
            .map(|role| &role.id)
            .collect();

        let mut holders: BTreeSet<PrincipalId> = state
            .direct
            .iter()
            .filter(|(_, grants)| grants.contains(permission))
            .map(|(principal, _)| principal.clone())
            .collect();
        holders.extend(
            state
                .memberships
                .iter()
                .filter(|(_, roles)| roles.iter().any(|role| via_roles.contains(role)))
                .map(|(principal, _)| principal.clone()),
        );
        Ok(holders.into_iter().collect())
    }

    async fn active_role_names(&self, principal: &PrincipalId) -> Result<BTreeSet<String>> {
        let state = self.state.read();
        state.require_principal(principal)?;
        Ok(state
            .active_roles(principal)
            .map(|role| role.name.clone())
            .collect())
    }
}
