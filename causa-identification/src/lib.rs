//! # causa-identification
//!
//! Identification of causal and missing-data queries on ADMGs. Every
//! algorithm snapshots the graph it is given and, on success, produces an
//! immutable symbolic [`Functional`] for the estimation layer.
//!
//! - [`OneLineId`]: one-line ID of `p(Y(a))`, with SWIG drawing and export
//!   of the intermediate CADMGs.
//! - [`OneLineGid`]: identification from several experimental laws, also
//!   from a graph with hidden vertices.
//! - [`MissingFullId`], [`MissingTargetId`]: full-law and target-law ID in
//!   missing-data ADMGs.

pub mod export;
mod factor;
pub mod functional;
pub mod gid;
pub mod missing_id;
pub mod one_line;
pub mod swig;

pub use export::IntermediatesManifest;
pub use functional::{expand_kernels, Functional, FunctionalVisitor, Kernel};
pub use gid::{DistrictSource, OneLineGid};
pub use missing_id::{MissingFullId, MissingTargetId};
pub use one_line::OneLineId;
pub use swig::Swig;
