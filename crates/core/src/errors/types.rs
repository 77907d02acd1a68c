//! Core error type definitions

use std::time::Duration;

/// Result type alias for warden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for warden operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The authoritative permission store could not answer
    #[error("permission store unavailable during {operation}: {message}")]
    StoreUnavailable {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O bound call exceeded its deadline
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A permission code that is not of the form `resource:action`
    #[error("invalid permission code '{code}': {message}")]
    InvalidPermissionCode { code: String, message: String },

    /// The store has no record of the principal
    #[error("principal '{principal}' not found")]
    PrincipalNotFound { principal: String },

    /// Cache layer errors surfaced to callers that asked for them explicitly
    #[error("cache error: {message}")]
    Cache { message: String },
}

impl Error {
    /// Whether this error leaves an authorization question unanswered.
    ///
    /// These must surface upstream as a server-side failure, never as a
    /// denial.
    #[must_use]
    pub const fn is_undeterminable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::Timeout { .. } | Self::PrincipalNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Configuration {
            message: format!("JSON error: {error}"),
        }
    }
}
