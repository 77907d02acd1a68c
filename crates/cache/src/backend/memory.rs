//! In-process fallback backend

use super::{BackendKind, CacheBackend, KeyTtl};
use crate::errors::{CacheError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use globset::{Glob, GlobMatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local map from key to value and absolute expiry.
///
/// Expired entries are evicted lazily on access, or in bulk by
/// [`MemoryBackend::purge_expired`].
fn expiry(ttl_secs: u64) -> Option<Instant> {
    (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs))
}

/// Compile a key glob, rejecting malformed patterns
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| CacheError::invalid_key(pattern, e.kind().to_string()))
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, "Purged expired fallback cache entries");
        }
        purged
    }

    /// Run [`purge_expired`](Self::purge_expired) every `period` until the
    /// returned handle is aborted. Nothing is spawned for a zero period or
    /// outside a tokio runtime.
    pub fn spawn_purge_task(self: &Arc<Self>, period: Duration) -> Option<JoinHandle<()>> {
        if period.is_zero() {
            return None;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime, expired fallback entries are only evicted lazily");
            return None;
        };
        let backend = Arc::clone(self);
        Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                backend.purge_expired();
            }
        }))
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = {
            let entry = self.entries.get(key)?;
            (!entry.is_expired(now)).then(|| entry.value.clone())
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        value
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: expiry(ttl_secs),
            },
        );
        true
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                entry.expires_at = expiry(ttl_secs);
                true
            }
            _ => false,
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now))
    }

    async fn delete_pattern(&self, pattern: &str) -> u64 {
        let matcher = match compile_pattern(pattern) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::warn!(recovery = ?e.recovery_hint(), "{}", e);
                return 0;
            }
        };
        let before = self.entries.len();
        self.entries.retain(|key, _| !matcher.is_match(key));
        before.saturating_sub(self.entries.len()) as u64
    }

    async fn ttl(&self, key: &str) -> KeyTtl {
        let now = Instant::now();
        match self.entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) => match entry.expires_at {
                None => KeyTtl::Persistent,
                Some(at) if at <= now => KeyTtl::Missing,
                Some(at) => {
                    let remaining = at.duration_since(now);
                    KeyTtl::Expires(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0))
                }
            },
        }
    }

    async fn clear_all(&self) -> bool {
        self.entries.clear();
        true
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn key_count(&self) -> u64 {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .count() as u64
    }
}
