//! Key/value backends with per-key TTL
//!
//! Implementations never return errors. A failed operation yields the
//! neutral value (`None`, `false`, `0`, [`KeyTtl::Missing`]) and is logged,
//! so the caller can route around it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

mod memory;
mod redis;
mod tiered;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;
pub use self::tiered::{BackendStats, TieredBackend};

/// Which implementation served, or would serve, an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    Redis,
    Tiered,
}

impl BackendKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
            Self::Tiered => "tiered",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Missing,
    Persistent,
    Expires(u64),
}

impl KeyTtl {
    /// Redis-style integer: `-2` absent, `-1` no expiry, else seconds left
    pub const fn as_seconds(&self) -> i64 {
        match self {
            Self::Missing => -2,
            Self::Persistent => -1,
            Self::Expires(secs) => *secs as i64,
        }
    }

    pub const fn from_seconds(secs: i64) -> Self {
        match secs {
            -1 => Self::Persistent,
            s if s < 0 => Self::Missing,
            s => Self::Expires(s as u64),
        }
    }
}

/// Outcome of removing one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    Removed,
    Absent,
    /// The key may still be live in a backend that could not be reached
    Failed,
}

impl Removal {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Removed => "removed",
            Self::Absent => "absent",
            Self::Failed => "failed",
        }
    }

    /// Combine the outcomes of two tiers. A failure on either side wins.
    pub const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Failed, _) | (_, Self::Failed) => Self::Failed,
            (Self::Removed, _) | (_, Self::Removed) => Self::Removed,
            _ => Self::Absent,
        }
    }
}

/// A key/value store with per-key expiry.
///
/// A `ttl_secs` of zero stores the value without expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool;

    /// Remove `key`, returning whether it was present
    async fn delete(&self, key: &str) -> bool;

    /// Remove `key`, telling an absent key apart from one that could not be
    /// reached
    async fn remove(&self, key: &str) -> Removal {
        if self.delete(key).await {
            Removal::Removed
        } else {
            Removal::Absent
        }
    }

    /// Reset the expiry of a live key without rewriting its value, returning
    /// whether the key existed. Zero makes it persistent.
    async fn expire(&self, key: &str, ttl_secs: u64) -> bool;

    /// Remove every key matching the glob `pattern`, returning the count
    async fn delete_pattern(&self, pattern: &str) -> u64;

    async fn ttl(&self, key: &str) -> KeyTtl;

    async fn clear_all(&self) -> bool;

    /// Cheap round trip used as the health probe
    async fn ping(&self) -> bool;

    async fn key_count(&self) -> u64;
}
