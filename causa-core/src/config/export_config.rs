use serde::{Deserialize, Serialize};

use super::defaults;

/// Layout direction of rendered diagrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankDirection {
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "LR")]
    LeftRight,
}

/// Diagram and intermediate-artifact export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Folder that `export_intermediates` writes into.
    pub intermediates_dir: String,
    /// Layout direction of rendered graphs.
    pub rank_direction: RankDirection,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            intermediates_dir: defaults::DEFAULT_INTERMEDIATES_DIR.to_string(),
            rank_direction: RankDirection::default(),
        }
    }
}
