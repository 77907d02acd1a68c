//! Error conversion utilities

use super::types::{CacheError, RecoveryHint, SerializationOp};
use crate::backend::BackendKind;
use std::time::Duration;

impl CacheError {
    /// A failed round trip to the distributed backend
    pub fn network(
        endpoint: &str,
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            endpoint: endpoint.to_string(),
            operation,
            source: source.into(),
            recovery_hint: RecoveryHint::CheckNetwork {
                endpoint: endpoint.to_string(),
            },
        }
    }

    /// A call that did not finish within its deadline
    pub fn timeout(operation: &'static str, duration: Duration) -> Self {
        Self::Timeout {
            operation,
            duration,
            recovery_hint: RecoveryHint::UseFallback,
        }
    }

    /// The backend refused service before any command was sent
    pub fn unavailable(backend: BackendKind, endpoint: &str, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            backend,
            endpoint: endpoint.to_string(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::UseFallback,
        }
    }

    /// A key or key pattern the backend cannot interpret
    pub fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::Ignore,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }
}

/// Convert serde_json errors to cache errors
impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            key: String::new(),
            operation: SerializationOp::Decode,
            source: Box::new(error),
            recovery_hint: RecoveryHint::ClearAndRetry,
        }
    }
}

/// Convert prometheus registration errors to cache errors
impl From<prometheus::Error> for CacheError {
    fn from(error: prometheus::Error) -> Self {
        Self::Configuration {
            message: format!("failed to register metrics: {error}"),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Check for duplicate metric registration".to_string(),
            },
        }
    }
}

/// Convert cache errors to core errors
impl From<CacheError> for warden_core::Error {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Configuration { message, .. } => {
                warden_core::Error::Configuration { message }
            }
            other => warden_core::Error::Cache {
                message: other.to_string(),
            },
        }
    }
}
