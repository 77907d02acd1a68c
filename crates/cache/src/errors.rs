//! Error handling for the cache layer
//!
//! Errors carry a recovery hint so callers and operators can tell a flaky
//! primary apart from a misconfiguration. Backends never let these escape
//! through the `CacheBackend` trait; they log them and return the neutral
//! value of the operation instead.

mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
