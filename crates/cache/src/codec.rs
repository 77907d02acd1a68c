//! JSON encoding of cached values

use crate::errors::{CacheError, RecoveryHint, Result, SerializationOp};
use serde::{de::DeserializeOwned, Serialize};

pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CacheError::Serialization {
        key: key.to_string(),
        operation: SerializationOp::Encode,
        source: Box::new(e),
        recovery_hint: RecoveryHint::Ignore,
    })
}

pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| CacheError::Serialization {
        key: key.to_string(),
        operation: SerializationOp::Decode,
        source: Box::new(e),
        recovery_hint: RecoveryHint::ClearAndRetry,
    })
}
