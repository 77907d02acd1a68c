//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Serialization { recovery_hint, .. }
            | Self::InvalidKey { recovery_hint, .. }
            | Self::StoreUnavailable { recovery_hint, .. }
            | Self::Network { recovery_hint, .. }
            | Self::Timeout { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Check if the same call may succeed once the backend recovers
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.recovery_hint(),
            RecoveryHint::CheckNetwork { .. } | RecoveryHint::UseFallback
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::errors::SerializationOp;
    use std::time::Duration;

    #[test]
    fn backend_outages_are_transient() {
        let err = CacheError::timeout("GET", Duration::from_millis(250));
        assert!(err.is_transient());

        let err = CacheError::unavailable(BackendKind::Redis, "cache:6379", "connection refused");
        assert!(err.is_transient());
        assert_eq!(err.recovery_hint(), &RecoveryHint::UseFallback);
        assert_eq!(
            err.to_string(),
            "Cache store redis at 'cache:6379' unavailable: connection refused"
        );
    }

    #[test]
    fn corrupt_values_are_not_transient() {
        let source = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err = CacheError::Serialization {
            key: "principal:permissions:u1".into(),
            operation: SerializationOp::Decode,
            source: Box::new(source),
            recovery_hint: RecoveryHint::ClearAndRetry,
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("principal:permissions:u1"));
    }

    #[test]
    fn bad_patterns_are_ignored_not_retried() {
        let err = CacheError::invalid_key("[", "unclosed character class");
        assert!(!err.is_transient());
        assert_eq!(err.recovery_hint(), &RecoveryHint::Ignore);
    }
}
