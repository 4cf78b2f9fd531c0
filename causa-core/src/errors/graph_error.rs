/// Structural errors raised by graph construction, mutation and queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown vertex: {name}")]
    UnknownVertex { name: String },

    #[error("duplicate vertex: {name}")]
    DuplicateVertex { name: String },

    #[error("invalid {kind} edge {from} - {to}: {reason}")]
    InvalidEdge {
        kind: String,
        from: String,
        to: String,
        reason: String,
    },

    #[error("structural invariant violated: {reason}")]
    StructuralInvariant { reason: String },

    #[error("graph contains a directed cycle: {cycle}")]
    CyclicGraph { cycle: String },
}
