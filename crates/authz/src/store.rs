//! The authoritative permission store, as seen by the resolver
//!
//! Implementations live outside this crate (an ORM, a directory service).
//! Every method is a potential network round trip; callers bound them with
//! a deadline.

use async_trait::async_trait;
use std::collections::BTreeSet;
use warden_core::{PermissionCode, PermissionId, Principal, PrincipalId, Result, RoleId};

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// The principal record, or [`Error::PrincipalNotFound`](warden_core::Error::PrincipalNotFound)
    async fn get_principal(&self, principal: &PrincipalId) -> Result<Principal>;

    /// Active permissions granted to the principal directly
    async fn direct_grants(&self, principal: &PrincipalId) -> Result<BTreeSet<PermissionCode>>;

    /// Active permissions of the principal's active roles
    async fn role_grants(&self, principal: &PrincipalId) -> Result<BTreeSet<PermissionCode>>;

    /// Every principal holding the role, whether or not the role is active
    async fn principals_by_role(&self, role: &RoleId) -> Result<Vec<PrincipalId>>;

    /// Every principal holding the permission directly or through any role
    async fn principals_by_permission(&self, permission: &PermissionId)
        -> Result<Vec<PrincipalId>>;

    /// Names of the principal's active roles
    async fn active_role_names(&self, principal: &PrincipalId) -> Result<BTreeSet<String>>;
}
