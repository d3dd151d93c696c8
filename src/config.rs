//! Configuration for the state history store
//!
//! Loaded from TOML (or built in code) and shared by the builder, the
//! replay driver and the slot allocator.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Store configuration
///
/// # Example
/// ```
/// use estado::config::StateConfig;
///
/// let config = StateConfig::default();
/// assert_eq!(config.path_separator, '/');
/// assert!(config.ignore_missing_ongoing);
/// ```
///
/// # Example TOML
/// ```toml
/// path_separator = "/"
/// ignore_missing_ongoing = false
/// slot_width = 3
/// quark_capacity = 4096
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Separator used to split string paths and to render quark paths
    pub path_separator: char,

    /// Treat `update_ongoing` on a never-opened attribute as benign during
    /// replay (logged and counted) instead of aborting the session
    pub ignore_missing_ongoing: bool,

    /// Zero-padded width of slot attribute names (`000`, `001`, ...)
    pub slot_width: usize,

    /// Pre-allocation hint for the attribute arena and per-quark tables
    pub quark_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path_separator: '/',
            ignore_missing_ongoing: true,
            slot_width: 3,
            quark_capacity: 1024,
        }
    }
}

impl StateConfig {
    /// Abort replay on every sequencing error, including updates of
    /// attributes that were never opened
    pub fn strict() -> Self {
        Self {
            ignore_missing_ongoing: false,
            ..Self::default()
        }
    }

    /// Load and validate a configuration file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StateConfig =
            toml::from_str(content).context("Failed to parse TOML state configuration")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.slot_width == 0 {
            return Err("slot_width must be >= 1".to_string());
        }

        if self.quark_capacity == 0 {
            return Err("quark_capacity must be >= 1".to_string());
        }

        if self.path_separator == '*' {
            return Err("path_separator cannot be the wildcard '*'".to_string());
        }

        Ok(())
    }
}
