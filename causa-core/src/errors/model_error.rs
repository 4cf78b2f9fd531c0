/// Parametric model errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error(
        "fit did not converge after {iterations} iterations \
         (tolerance {tolerance:e}, last change {last_delta:e})"
    )]
    Convergence {
        iterations: usize,
        tolerance: f64,
        last_delta: f64,
    },

    #[error("{operation} requires {requires} to run first")]
    State {
        operation: &'static str,
        requires: &'static str,
    },

    #[error("singular matrix while {context}")]
    Singular { context: String },

    #[error("invalid data: {reason}")]
    InvalidData { reason: String },

    #[error("unsupported graph: {reason}")]
    UnsupportedGraph { reason: String },
}
