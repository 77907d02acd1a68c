//! Error types and result extensions for warden operations

mod builders;
mod extensions;
mod types;

pub use extensions::*;
pub use types::{Error, Result};
