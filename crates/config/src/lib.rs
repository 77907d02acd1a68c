//! Configuration management for warden
//!
//! The configuration is read once at process start, validated, and then
//! passed by value into the constructors that need it. Nothing here is
//! process-global.

pub mod config;
pub mod loader;
pub mod scenario;

pub use config::*;
pub use loader::ConfigLoader;
pub use scenario::{ContextFlag, Scenario, ScenarioTtl};
