//! # causa-graphs
//!
//! Mixed graph engine for causal graphical models.
//!
//! One [`Graph`] type carries a [`GraphKind`] tag whose [`EdgePermissions`]
//! decide which edge types are legal and which acyclicity and segregation
//! rules every mutation must preserve. On top of it sit the algorithms of
//! the nested Markov toolkit: districts and blocks, fixing, reachable
//! closures, Markov blankets and pillows, m-separation, maximal arid and
//! latent projections, intrinsic sets, missing-data naming and DOT rendering.

pub mod districts;
pub mod fixing;
pub mod graph;
pub mod intrinsic;
pub mod kind;
pub mod markov;
pub mod missing;
pub mod projection;
pub mod render;
pub mod separation;
pub mod vertex;

pub use graph::{Edge, Graph, VertexSet};
pub use intrinsic::IntrinsicGraph;
pub use kind::{Acyclicity, EdgePermissions, EdgeType, GraphKind};
pub use render::RenderOptions;
pub use vertex::{Cardinality, Vertex, VertexRole};
