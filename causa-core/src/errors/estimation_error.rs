use super::{GraphError, IdentificationError};

/// Estimation-layer errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    #[error("estimator {estimator} is not valid for a {strategy} treatment")]
    InvalidStrategy { estimator: String, strategy: String },

    #[error("dataset has no column named {name}")]
    MissingColumn { name: String },

    #[error("column {name} has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("dataset is empty")]
    EmptyData,

    #[error("singular system while {context}")]
    Singular { context: String },

    #[error("unsupported functional: {reason}")]
    UnsupportedFunctional { reason: String },

    #[error("invalid {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("unbound vertex {name} while evaluating a functional")]
    UnboundVertex { name: String },

    #[error(transparent)]
    Identification(#[from] IdentificationError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
