//! Display implementations for cache errors

use super::types::CacheError;
use std::fmt;

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization {
                key,
                operation,
                source,
                ..
            } => write!(f, "Failed to {operation:?} cache entry '{key}': {source}"),
            Self::InvalidKey { key, reason, .. } => {
                write!(f, "Invalid cache key '{key}': {reason}")
            }
            Self::StoreUnavailable {
                backend,
                endpoint,
                reason,
                ..
            } => write!(f, "Cache store {backend} at '{endpoint}' unavailable: {reason}"),
            Self::Network {
                endpoint,
                operation,
                source,
                ..
            } => write!(
                f,
                "Network error during {operation} with '{endpoint}': {source}"
            ),
            Self::Timeout {
                operation,
                duration,
                ..
            } => write!(f, "Timeout during {operation} after {duration:?}"),
            Self::Configuration { message, .. } => {
                write!(f, "Cache configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization { source, .. } => Some(source.as_ref()),
            Self::Network { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
