//! Permission resolution, cascading invalidation and the authorization gate
//!
//! ```text
//! AuthorizationGate -> PermissionResolver -> CacheBackend (read)
//!                                         -> PermissionStore on miss
//!                                         -> CacheBackend (write, TTL from TtlPolicy)
//! InvalidationCoordinator ---------------> CacheBackend (delete)
//! ```
//!
//! [`Warden`] wires all of it from a [`WardenConfig`](warden_config::WardenConfig)
//! and a [`PermissionStore`].

pub mod gate;
pub mod guard;
pub mod invalidation;
pub mod memory_store;
pub mod resolver;
pub mod store;
pub mod warden;

pub use gate::AuthorizationGate;
pub use guard::{guarded, AccessError, Guard};
pub use invalidation::{InvalidationCoordinator, InvalidationReport, InvalidationTarget};
pub use memory_store::{InMemoryStore, PermissionRecord, PrincipalFixture, RoleRecord, StoreFixture};
pub use resolver::PermissionResolver;
pub use store::PermissionStore;
pub use warden::{Warden, WardenBuilder};
