//! Error taxonomy for the causa workspace.
//!
//! Each concern has its own enum; [`CausaError`] joins them so that every
//! public operation can return a single [`CausaResult`].

mod estimation_error;
mod graph_error;
mod identification_error;
mod model_error;

pub use estimation_error::EstimationError;
pub use graph_error::GraphError;
pub use identification_error::IdentificationError;
pub use model_error::ModelError;

/// Result alias used across the workspace.
pub type CausaResult<T> = Result<T, CausaError>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum CausaError {
    #[error(transparent)]
    GraphError(#[from] GraphError),

    #[error(transparent)]
    IdentificationError(#[from] IdentificationError),

    #[error(transparent)]
    EstimationError(#[from] EstimationError),

    #[error(transparent)]
    ModelError(#[from] ModelError),

    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CausaError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Render a vertex set as `{A, B, C}` for error messages.
pub fn format_vertex_set<I, S>(vertices: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = vertices
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect();
    format!("{{{}}}", names.join(", "))
}
