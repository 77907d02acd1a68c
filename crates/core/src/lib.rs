//! Core domain types, errors, and constants for `warden`.
//!
//! Everything that the resolver, the cache and the authorization gate agree
//! on lives here, so the other crates never exchange raw strings.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias. Errors that
//!   leave an authorization decision undeterminable are flagged so callers can
//!   tell "denied" apart from "could not decide".
//! - **`types`**: newtype identifiers, `PermissionCode`, `PermissionSet`,
//!   `Principal`, the `Requirement` expression and the `Decision` it yields.
//! - **`constants`**: environment variable names and default namespaces.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
