//! Core error types for the cache layer

use crate::backend::BackendKind;
use std::time::Duration;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error type for cache operations
#[derive(Debug)]
pub enum CacheError {
    /// Encoding or decoding a cached value failed
    Serialization {
        key: String,
        operation: SerializationOp,
        source: Box<dyn std::error::Error + Send + Sync>,
        recovery_hint: RecoveryHint,
    },

    /// Invalid cache key or key pattern
    InvalidKey {
        key: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Backend refused service before any command was sent
    StoreUnavailable {
        backend: BackendKind,
        endpoint: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Network error talking to the distributed backend
    Network {
        endpoint: String,
        operation: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
        recovery_hint: RecoveryHint,
    },

    /// Timeout during cache operation
    Timeout {
        operation: &'static str,
        duration: Duration,
        recovery_hint: RecoveryHint,
    },

    /// Configuration error
    Configuration {
        message: String,
        recovery_hint: RecoveryHint,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryHint {
    /// Drop the entry and recompute it from the store
    ClearAndRetry,

    /// Verify network connectivity
    CheckNetwork { endpoint: String },

    /// Serve from the in-process fallback backend
    UseFallback,

    /// Update cache configuration
    UpdateConfiguration,

    /// Operation can be safely ignored
    Ignore,

    /// No automated recovery possible
    Manual { instructions: String },
}

/// Serialization operation types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationOp {
    Encode,
    Decode,
}
