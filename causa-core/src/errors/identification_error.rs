use super::GraphError;

/// Identification errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentificationError {
    #[error("query is not identified: district {district} ({reason})")]
    NotIdentified { district: String, reason: String },

    #[error("{operation} requires {requires} to run first")]
    State {
        operation: &'static str,
        requires: &'static str,
    },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
