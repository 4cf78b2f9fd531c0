//! Districts (bidirected components) and blocks (undirected components).
//!
//! Both are computed over random vertices only and always from the current
//! edge set, so they stay correct after any mutation or fixing step.

use crate::graph::{Graph, VertexSet};
use crate::kind::EdgeType;

impl Graph {
    /// Partition of the random vertices into districts, sorted.
    pub fn districts(&self) -> Vec<VertexSet> {
        self.components(EdgeType::Bidirected, |v| !v.fixed)
    }

    /// The district of `vertex`; empty if the vertex is unknown or fixed.
    pub fn district(&self, vertex: &str) -> VertexSet {
        self.random_component(vertex, EdgeType::Bidirected)
    }

    /// Union of the districts of `vertices`.
    pub fn districts_of<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        vertices
            .into_iter()
            .flat_map(|v| self.district(v.as_ref()))
            .collect()
    }

    /// Partition of the random vertices into blocks, sorted.
    pub fn blocks(&self) -> Vec<VertexSet> {
        self.components(EdgeType::Undirected, |v| !v.fixed)
    }

    /// The block of `vertex`; empty if the vertex is unknown or fixed.
    pub fn block(&self, vertex: &str) -> VertexSet {
        self.random_component(vertex, EdgeType::Undirected)
    }

    fn random_component(&self, vertex: &str, edge: EdgeType) -> VertexSet {
        let Ok(idx) = self.index_of(vertex) else {
            return VertexSet::new();
        };
        if self.is_fixed(vertex) {
            return VertexSet::new();
        }
        self.names(self.reach(vec![idx], edge, None, &|v| !v.fixed))
    }
}
