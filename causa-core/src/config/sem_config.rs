use serde::{Deserialize, Serialize};

use super::defaults;

/// Linear Gaussian SEM fitting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemConfig {
    /// Maximum number of RICF sweeps before reporting non-convergence.
    pub max_iterations: usize,
    /// Convergence threshold on the change of the negative log-likelihood.
    pub tolerance: f64,
    /// Return unconverged parameters (flagged) instead of an error.
    pub accept_unconverged: bool,
}

impl Default for SemConfig {
    fn default() -> Self {
        Self {
            max_iterations: defaults::DEFAULT_SEM_MAX_ITERATIONS,
            tolerance: defaults::DEFAULT_SEM_TOLERANCE,
            accept_unconverged: defaults::DEFAULT_SEM_ACCEPT_UNCONVERGED,
        }
    }
}
