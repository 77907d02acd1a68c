//! Builder methods for creating errors with context

use super::types::Error;
use std::time::Duration;

impl Error {
    /// Create a store-unavailable error
    #[must_use]
    pub fn store_unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a store-unavailable error with a source error
    #[must_use]
    pub fn store_unavailable_with_source(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid permission code error
    #[must_use]
    pub fn invalid_permission_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidPermissionCode {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a principal-not-found error
    #[must_use]
    pub fn principal_not_found(principal: impl Into<String>) -> Self {
        Error::PrincipalNotFound {
            principal: principal.into(),
        }
    }
}
