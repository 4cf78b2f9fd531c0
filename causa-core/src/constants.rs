/// Causa library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of counterfactual vertices in missing-data graphs (`X_1`).
pub const COUNTERFACTUAL_PREFIX: &str = "X_";

/// Prefix of missingness indicators in missing-data graphs (`R_1`).
pub const INDICATOR_PREFIX: &str = "R_";

/// Prefix of observed proxies in missing-data graphs (`Xp_1`).
pub const PROXY_PREFIX: &str = "Xp_";

/// Numerical floor used when dividing by estimated probabilities.
pub const PROBABILITY_FLOOR: f64 = 1e-12;

/// File name of the manifest written next to exported intermediates.
pub const INTERMEDIATES_MANIFEST: &str = "intermediates.json";
