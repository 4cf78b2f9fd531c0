//! Default values for every configuration field.

// SEM fitting
pub const DEFAULT_SEM_MAX_ITERATIONS: usize = 500;
pub const DEFAULT_SEM_TOLERANCE: f64 = 1e-8;
pub const DEFAULT_SEM_ACCEPT_UNCONVERGED: bool = false;

// Estimation
pub const DEFAULT_N_BOOTSTRAPS: usize = 0;
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_GLM_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_GLM_TOLERANCE: f64 = 1e-10;

// Export
pub const DEFAULT_INTERMEDIATES_DIR: &str = "intermediates";

// Observability
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_JSON: bool = false;
