//! Domain types shared by the resolver, cache and gate

pub mod decision;
pub mod newtypes;
pub mod permission_set;
pub mod principal;
pub mod requirement;

pub use decision::{Decision, DenyKind, DenyReason};
pub use newtypes::{PermissionCode, PermissionId, PrincipalId, RoleId};
pub use permission_set::PermissionSet;
pub use principal::Principal;
pub use requirement::Requirement;
