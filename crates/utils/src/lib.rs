//! Shared utilities for warden
//!
//! Small helpers used across the workspace: tracing initialisation and
//! deadline enforcement for I/O bound calls.

pub mod deadline;
pub mod tracing;

pub use deadline::{within, Deadline};
