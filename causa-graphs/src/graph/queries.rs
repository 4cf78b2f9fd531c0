//! Pure neighborhood, ancestry and ordering queries.
//!
//! Set-valued queries accept any iterable of names; names not in the graph
//! contribute nothing.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction;

use causa_core::errors::{format_vertex_set, GraphError};

use crate::kind::EdgeType;

use super::{acyclicity, Graph, VertexSet};

impl Graph {
    fn linked_names<S: AsRef<str>>(
        &self,
        vertices: impl IntoIterator<Item = S>,
        edge: EdgeType,
        direction: Option<Direction>,
    ) -> VertexSet {
        let linked: Vec<_> = self
            .indices(vertices)
            .into_iter()
            .flat_map(|idx| self.linked(idx, edge, direction))
            .collect();
        self.names(linked)
    }

    /// Union of the parents of `vertices`.
    pub fn parents<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        self.linked_names(vertices, EdgeType::Directed, Some(Direction::Incoming))
    }

    /// Union of the children of `vertices`.
    pub fn children<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        self.linked_names(vertices, EdgeType::Directed, Some(Direction::Outgoing))
    }

    /// Union of the bidirected neighbors of `vertices`.
    pub fn siblings<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        self.linked_names(vertices, EdgeType::Bidirected, None)
    }

    /// Union of the undirected neighbors of `vertices`.
    pub fn neighbors<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        self.linked_names(vertices, EdgeType::Undirected, None)
    }

    /// Ancestors of `vertices`, including the vertices themselves.
    pub fn ancestors<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        let starts = self.indices(vertices);
        self.names(self.reach(starts, EdgeType::Directed, Some(Direction::Incoming), &|_| true))
    }

    /// Descendants of `vertices`, including the vertices themselves.
    pub fn descendants<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        let starts = self.indices(vertices);
        self.names(self.reach(starts, EdgeType::Directed, Some(Direction::Outgoing), &|_| true))
    }

    /// Topological order of all vertices: parents before children, ties
    /// broken by name.
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        let mut in_degree: BTreeMap<String, usize> = self
            .vertex_names()
            .into_iter()
            .map(|v| (v, 0))
            .collect();
        for (_, child) in self.di_edges() {
            if let Some(d) = in_degree.get_mut(&child) {
                *d += 1;
            }
        }

        let mut ready: BTreeSet<String> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(v, _)| v.clone())
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(v) = ready.pop_first() {
            for child in self.children([&v]) {
                if let Some(d) = in_degree.get_mut(&child) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(child);
                    }
                }
            }
            order.push(v);
        }

        if order.len() < in_degree.len() {
            let cycle = acyclicity::find_cycles(self)
                .into_iter()
                .next()
                .unwrap_or_default();
            return Err(GraphError::CyclicGraph {
                cycle: format_vertex_set(&cycle),
            });
        }
        Ok(order)
    }

    /// Every directed path, with at least one edge, from a vertex of
    /// `sources` to a vertex of `sinks`.
    pub fn directed_paths<S: AsRef<str>, T: AsRef<str>>(
        &self,
        sources: impl IntoIterator<Item = S>,
        sinks: impl IntoIterator<Item = T>,
    ) -> Vec<Vec<String>> {
        let sinks: VertexSet = sinks.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut paths = Vec::new();
        for source in sources {
            let source = source.as_ref();
            if !self.contains(source) {
                continue;
            }
            let mut path = vec![source.to_string()];
            self.extend_paths(&mut path, &sinks, &mut paths);
        }
        paths
    }

    fn extend_paths(&self, path: &mut Vec<String>, sinks: &VertexSet, paths: &mut Vec<Vec<String>>) {
        let Some(last) = path.last().cloned() else {
            return;
        };
        for child in self.children([&last]) {
            if path.contains(&child) {
                continue;
            }
            path.push(child.clone());
            if sinks.contains(&child) {
                paths.push(path.clone());
            }
            self.extend_paths(path, sinks, paths);
            path.pop();
        }
    }

    /// Vertices that precede the first member of `vertices` in `order`.
    pub fn pre<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>, order: &[String]) -> VertexSet {
        let targets: BTreeSet<String> = vertices.into_iter().map(|v| v.as_ref().to_string()).collect();
        order
            .iter()
            .take_while(|v| !targets.contains(*v))
            .cloned()
            .collect()
    }

    /// Induced subgraph on `vertices`: an independent copy of the same kind
    /// with fixed flags and roles preserved.
    pub fn subgraph<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> Graph {
        let keep: VertexSet = vertices
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .filter(|v| self.contains(v))
            .collect();
        let mut sub = Graph::new(self.kind());
        for vertex in self.vertices().filter(|v| keep.contains(&v.name)) {
            // Names are unique in the source graph.
            let _ = sub.add_vertex_with(vertex.clone());
        }
        for edge in self.edges() {
            if keep.contains(&edge.from) && keep.contains(&edge.to) {
                let _ = sub.insert_edge_by_name(edge.edge, &edge.from, &edge.to);
            }
        }
        sub
    }

    /// Whether every vertex and edge of `self` is in `other`.
    pub fn is_subgraph(&self, other: &Graph) -> bool {
        self.vertex_names().is_subset(&other.vertex_names())
            && self
                .edges()
                .iter()
                .all(|e| other.has_edge(e.edge, &e.from, &e.to))
    }

    /// Whether `self` is a subgraph of `other` whose vertex set is closed
    /// under taking ancestors in `other`.
    pub fn is_ancestral_subgraph(&self, other: &Graph) -> bool {
        let vertices = self.vertex_names();
        self.is_subgraph(other) && other.ancestors(&vertices).is_subset(&vertices)
    }
}
