//! # Pool Configuration
//!
//! Resource pools are tuned from TOML, the same way the rest of the engine's
//! data is kept out of code.
//!
//! ```toml
//! name = "meshes"
//! initial_capacity = 4096
//! immediate_unload = false
//! ```

use crate::error::{ResourceError, ResourceResult};
use serde::Deserialize;
use std::path::Path;

/// Default number of index slots reserved by a pool.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Settings of a [`ResourcePool`](crate::ResourcePool).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Name used in log output.
    pub name: String,
    /// Entries reserved up front.
    pub initial_capacity: usize,
    /// Bulk unloads run immediately instead of through deferral.
    pub immediate_unload: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "resources".to_string(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            immediate_unload: false,
        }
    }
}

impl PoolConfig {
    /// Parses a configuration from TOML text. Missing keys keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] for malformed TOML or unknown
    /// keys.
    pub fn from_toml_str(text: &str) -> ResourceResult<Self> {
        toml::from_str(text)
            .map_err(|e| ResourceError::InvalidConfig(format!("Failed to parse pool config: {e}")))
    }

    /// Reads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if the file cannot be read or
    /// parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ResourceResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ResourceError::InvalidConfig(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}
