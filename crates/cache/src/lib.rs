//! Two-tier permission cache and TTL policy engine for warden
//!
//! ## Key Components
//!
//! - **`backend`**: the [`CacheBackend`] contract, the in-process
//!   [`MemoryBackend`], the distributed [`RedisBackend`], and the
//!   [`TieredBackend`] strategy that routes between them by live health.
//! - **`ttl`**: the scenario-driven [`TtlPolicy`].
//! - **`keys`**: cache key layout.
//! - **`metrics`**: prometheus metric handles.
//! - **`admin`**: dynamic-TTL writes, retuning and operator views.

pub mod admin;
pub mod backend;
pub mod codec;
pub mod errors;
pub mod keys;
pub mod metrics;
pub mod ttl;

pub use admin::{CacheAdmin, CacheStats, HealthReport, HealthStatus, ScenarioSummary, ScenarioWrite};
pub use backend::{
    BackendKind, BackendStats, CacheBackend, KeyTtl, MemoryBackend, RedisBackend, Removal,
    TieredBackend,
};
pub use errors::{CacheError, RecoveryHint, Result};
pub use keys::KeySpace;
pub use metrics::CacheMetrics;
pub use ttl::{TtlContext, TtlDecision, TtlPolicy, TtlPreview, TtlSource};
