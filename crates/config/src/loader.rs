//! Configuration loader for warden
//!
//! Reads an optional JSON file, then applies environment overrides, then
//! validates. Intended to run once at startup.

use crate::config::WardenConfig;
use std::path::{Path, PathBuf};
use warden_core::constants::{
    WARDEN_BASE_TTL_VAR, WARDEN_CONFIG_VAR, WARDEN_ENABLE_REDIS_VAR, WARDEN_KEY_PREFIX_VAR,
    WARDEN_REDIS_URL_VAR,
};
use warden_core::{Error, Result, ResultExt};

/// Configuration loader that handles all startup configuration
pub struct ConfigLoader {
    /// Explicit configuration file, overriding `WARDEN_CONFIG`
    file: Option<PathBuf>,
    /// Whether to apply `WARDEN_*` environment overrides
    apply_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            file: None,
            apply_env: true,
        }
    }

    /// Load from this file instead of `WARDEN_CONFIG`
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip environment overrides
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    /// Load, override and validate
    pub fn load(self) -> Result<WardenConfig> {
        let file = self.file.clone().or_else(|| {
            self.apply_env
                .then(|| std::env::var_os(WARDEN_CONFIG_VAR).map(PathBuf::from))
                .flatten()
        });

        let mut config = match file {
            Some(path) => Self::read_file(&path)?,
            None => WardenConfig::default(),
        };

        if self.apply_env {
            Self::apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        tracing::debug!(
            primary_enabled = config.primary.enabled,
            base_ttl = config.base_ttl_secs,
            key_prefix = %config.key_prefix,
            "Loaded warden configuration"
        );
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<WardenConfig> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    fn apply_env_overrides(config: &mut WardenConfig) -> Result<()> {
        if let Ok(url) = std::env::var(WARDEN_REDIS_URL_VAR) {
            config.primary.url = url;
        }
        if let Ok(enabled) = std::env::var(WARDEN_ENABLE_REDIS_VAR) {
            config.primary.enabled = parse_bool(WARDEN_ENABLE_REDIS_VAR, &enabled)?;
        }
        if let Ok(ttl) = std::env::var(WARDEN_BASE_TTL_VAR) {
            config.base_ttl_secs = ttl
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{WARDEN_BASE_TTL_VAR} must be a number of seconds"))?;
        }
        if let Ok(prefix) = std::env::var(WARDEN_KEY_PREFIX_VAR) {
            config.key_prefix = prefix;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(variable: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::configuration(format!(
            "{variable} must be a boolean, got '{other}'"
        ))),
    }
}
