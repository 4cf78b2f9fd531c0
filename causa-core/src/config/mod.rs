//! Configuration for every causa subsystem.
//!
//! Loaded from TOML; every section and field falls back to its default.

pub mod defaults;
mod estimation_config;
mod export_config;
mod observability_config;
mod sem_config;

pub use estimation_config::EstimationConfig;
pub use export_config::{ExportConfig, RankDirection};
pub use observability_config::ObservabilityConfig;
pub use sem_config::SemConfig;

use serde::{Deserialize, Serialize};

use crate::errors::{CausaError, CausaResult};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CausaConfig {
    pub sem: SemConfig,
    pub estimation: EstimationConfig,
    pub export: ExportConfig,
    pub observability: ObservabilityConfig,
}

impl CausaConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml(source: &str) -> CausaResult<Self> {
        toml::from_str(source).map_err(|e| CausaError::ConfigError {
            reason: e.to_string(),
        })
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml(&self) -> CausaResult<String> {
        toml::to_string_pretty(self).map_err(|e| CausaError::ConfigError {
            reason: e.to_string(),
        })
    }

    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> CausaResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| CausaError::io(path.display().to_string(), e))?;
        Self::from_toml(&source)
    }
}
