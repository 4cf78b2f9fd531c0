use serde::{Deserialize, Serialize};

use super::defaults;

/// Estimation subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Number of bootstrap replicates for effect intervals (0 disables).
    pub n_bootstraps: usize,
    /// Significance level of bootstrap intervals.
    pub alpha: f64,
    /// Seed of the bootstrap resampler.
    pub seed: u64,
    /// Maximum IRLS iterations for binary GLMs.
    pub glm_max_iterations: usize,
    /// IRLS convergence threshold on the coefficient change.
    pub glm_tolerance: f64,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            n_bootstraps: defaults::DEFAULT_N_BOOTSTRAPS,
            alpha: defaults::DEFAULT_ALPHA,
            seed: defaults::DEFAULT_SEED,
            glm_max_iterations: defaults::DEFAULT_GLM_MAX_ITERATIONS,
            glm_tolerance: defaults::DEFAULT_GLM_TOLERANCE,
        }
    }
}
