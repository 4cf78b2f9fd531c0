//! The fixing operation and everything derived from it: fixability, valid
//! fixing orders and reachable closures.
//!
//! Fixing a vertex marks it fixed and deletes its incoming directed edges
//! and all of its bidirected edges; undirected edges between two fixed
//! vertices are deleted as well. Candidates are always tried in name order,
//! so every returned fixing order is deterministic.

use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use tracing::debug;

use causa_core::errors::GraphError;

use crate::graph::{Graph, VertexSet};
use crate::kind::EdgeType;

impl Graph {
    /// Fix `vertices`. Fails without modifying the graph if any is unknown.
    pub fn fix<S: AsRef<str>>(&mut self, vertices: impl IntoIterator<Item = S>) -> Result<(), GraphError> {
        let indices = vertices
            .into_iter()
            .map(|v| self.index_of(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for &idx in &indices {
            self.mark_fixed(idx);
        }
        for idx in indices {
            self.cut_fixed_edges(idx);
        }
        Ok(())
    }

    fn mark_fixed(&mut self, idx: NodeIndex) {
        let name = self.name_of(idx).to_string();
        if let Some(vertex) = self.vertex_mut(&name) {
            vertex.fixed = true;
        }
    }

    fn cut_fixed_edges(&mut self, idx: NodeIndex) {
        self.remove_linked(idx, EdgeType::Directed, Some(Direction::Incoming));
        self.remove_linked(idx, EdgeType::Bidirected, None);
        for neighbor in self.linked(idx, EdgeType::Undirected, None) {
            if self.is_fixed(self.name_of(neighbor)) {
                if let Some(e) = self.find_edge(idx, neighbor, EdgeType::Undirected) {
                    self.remove_edge_index(e);
                }
            }
        }
    }

    fn fix_one(&mut self, idx: NodeIndex) {
        self.mark_fixed(idx);
        self.cut_fixed_edges(idx);
    }

    /// A random vertex is fixable when none of its proper descendants lies
    /// in its district.
    pub fn is_fixable(&self, vertex: &str) -> bool {
        if !self.contains(vertex) || self.is_fixed(vertex) {
            return false;
        }
        let district = self.district(vertex);
        self.descendants([vertex])
            .intersection(&district)
            .all(|v| v == vertex)
    }

    /// Try to fix all of `vertices`, one fixable vertex at a time.
    ///
    /// Returns whether every vertex could be fixed, and the order in which
    /// the fixable ones were fixed. Vertices already fixed are skipped.
    pub fn fixable<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> (bool, Vec<String>) {
        let mut remaining = VertexSet::new();
        for v in vertices {
            let v = v.as_ref();
            if !self.contains(v) {
                return (false, Vec::new());
            }
            if !self.is_fixed(v) {
                remaining.insert(v.to_string());
            }
        }

        let mut graph = self.clone();
        let mut order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let Some(next) = remaining.iter().find(|v| graph.is_fixable(v)).cloned() else {
                debug!(stuck = ?remaining, "no fixable vertex left");
                return (false, order);
            };
            if let Ok(idx) = graph.index_of(&next) {
                graph.fix_one(idx);
            }
            remaining.remove(&next);
            order.push(next);
        }
        (true, order)
    }

    /// Reachable closure of `vertices`: repeatedly fix any fixable random
    /// vertex outside the set.
    ///
    /// Returns the closure (the random vertices left), the fixing order and
    /// the resulting conditional graph.
    pub fn reachable_closure<S: AsRef<str>>(
        &self,
        vertices: impl IntoIterator<Item = S>,
    ) -> (VertexSet, Vec<String>, Graph) {
        let target: VertexSet = vertices.into_iter().map(|v| v.as_ref().to_string()).collect();
        let mut graph = self.clone();
        let mut order = Vec::new();
        loop {
            let next = graph
                .random_vertices()
                .into_iter()
                .filter(|v| !target.contains(v))
                .find(|v| graph.is_fixable(v));
            let Some(next) = next else { break };
            if let Ok(idx) = graph.index_of(&next) {
                graph.fix_one(idx);
            }
            order.push(next);
        }
        (graph.random_vertices(), order, graph)
    }
}
