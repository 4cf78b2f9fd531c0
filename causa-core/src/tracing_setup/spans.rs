//! Span definitions per operation: identification, fitting, estimation.

/// Create an identification span.
#[macro_export]
macro_rules! identification_span {
    ($algorithm:expr, $treatments:expr, $outcomes:expr) => {
        tracing::info_span!(
            "causa.identification",
            algorithm = %$algorithm,
            treatments = ?$treatments,
            outcomes = ?$outcomes
        )
    };
}

/// Create a model fitting span.
#[macro_export]
macro_rules! fit_span {
    ($model:expr, $n_rows:expr) => {
        tracing::info_span!("causa.fit", model = %$model, n_rows = $n_rows)
    };
}

/// Create an estimation span.
#[macro_export]
macro_rules! estimation_span {
    ($estimator:expr, $treatment:expr, $outcome:expr) => {
        tracing::info_span!(
            "causa.estimation",
            estimator = ?$estimator,
            treatment = %$treatment,
            outcome = %$outcome
        )
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const IDENTIFICATION: &str = "causa.identification";
    pub const FIT: &str = "causa.fit";
    pub const ESTIMATION: &str = "causa.estimation";
}
