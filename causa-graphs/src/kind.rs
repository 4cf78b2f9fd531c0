//! Graph kinds and the edge permissions each one enforces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three edge types of a mixed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// `a -> b`
    Directed,
    /// `a <-> b`
    Bidirected,
    /// `a - b`
    Undirected,
}

impl EdgeType {
    /// Whether `a ? b` and `b ? a` denote the same edge.
    pub fn is_symmetric(self) -> bool {
        !matches!(self, EdgeType::Directed)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeType::Directed => write!(f, "directed"),
            EdgeType::Bidirected => write!(f, "bidirected"),
            EdgeType::Undirected => write!(f, "undirected"),
        }
    }
}

/// Which cycles a graph kind forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Acyclicity {
    /// No constraint.
    Unconstrained,
    /// No directed cycles.
    Directed,
    /// No partially directed cycles: no cycle made of directed and
    /// undirected edges with at least one directed edge, all directed
    /// edges pointing the same way.
    PartiallyDirected,
}

/// Edge rules of a graph kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePermissions {
    pub directed: bool,
    pub bidirected: bool,
    pub undirected: bool,
    pub acyclicity: Acyclicity,
    /// No vertex may have both a sibling and a neighbor.
    pub segregated: bool,
}

impl EdgePermissions {
    pub fn allows(&self, edge: EdgeType) -> bool {
        match edge {
            EdgeType::Directed => self.directed,
            EdgeType::Bidirected => self.bidirected,
            EdgeType::Undirected => self.undirected,
        }
    }
}

/// The kind of a [`crate::Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    /// Any combination of edges; topological operations may fail.
    Mixed,
    Dag,
    Admg,
    /// Chain graph.
    Cg,
    /// Undirected graph.
    Ug,
    /// Segregated graph.
    Sg,
    /// Bidirected graph.
    Bg,
    /// ADMG over counterfactuals, missingness indicators and proxies.
    MissingAdmg,
}

impl GraphKind {
    pub fn permissions(self) -> EdgePermissions {
        let (directed, bidirected, undirected, acyclicity, segregated) = match self {
            GraphKind::Mixed => (true, true, true, Acyclicity::Unconstrained, false),
            GraphKind::Dag => (true, false, false, Acyclicity::Directed, false),
            GraphKind::Admg | GraphKind::MissingAdmg => {
                (true, true, false, Acyclicity::Directed, false)
            }
            GraphKind::Cg => (true, false, true, Acyclicity::PartiallyDirected, false),
            GraphKind::Ug => (false, false, true, Acyclicity::Unconstrained, false),
            GraphKind::Sg => (true, true, true, Acyclicity::PartiallyDirected, true),
            GraphKind::Bg => (false, true, false, Acyclicity::Unconstrained, false),
        };
        EdgePermissions {
            directed,
            bidirected,
            undirected,
            acyclicity,
            segregated,
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphKind::Mixed => "mixed graph",
            GraphKind::Dag => "DAG",
            GraphKind::Admg => "ADMG",
            GraphKind::Cg => "CG",
            GraphKind::Ug => "UG",
            GraphKind::Sg => "SG",
            GraphKind::Bg => "BG",
            GraphKind::MissingAdmg => "missing-data ADMG",
        };
        f.write_str(name)
    }
}
