//! petgraph::StableGraph wrapper holding vertices and typed edges.
//!
//! Every edge type lives in one directed `StableGraph`. Directed edges are
//! stored `parent -> child`; bidirected and undirected edges are stored once,
//! oriented from the lexicographically smaller endpoint, and matched in
//! either orientation.

pub mod acyclicity;
mod queries;

use std::collections::{BTreeMap, BTreeSet};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use causa_core::errors::GraphError;

use crate::kind::{Acyclicity, EdgeType, GraphKind};
use crate::vertex::Vertex;

/// Ordered set of vertex names. All set-valued queries return one.
pub type VertexSet = BTreeSet<String>;

/// The underlying petgraph type.
pub(crate) type MixedStableGraph = StableGraph<Vertex, EdgeType, Directed>;

/// One edge, reported with its stored orientation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub edge: EdgeType,
    pub from: String,
    pub to: String,
}

/// A mixed graph of a given [`GraphKind`].
#[derive(Debug, Clone)]
pub struct Graph {
    kind: GraphKind,
    graph: MixedStableGraph,
    node_index: BTreeMap<String, NodeIndex>,
}

impl Graph {
    /// An empty graph of the given kind.
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            graph: StableGraph::new(),
            node_index: BTreeMap::new(),
        }
    }

    /// Build a graph, validating every edge against the kind's rules.
    pub fn from_edges(
        kind: GraphKind,
        vertices: &[&str],
        di_edges: &[(&str, &str)],
        bi_edges: &[(&str, &str)],
        ud_edges: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(kind);
        for name in vertices {
            graph.add_vertex(name)?;
        }
        for (a, b) in di_edges {
            graph.add_diedge(a, b)?;
        }
        for (a, b) in bi_edges {
            graph.add_biedge(a, b)?;
        }
        for (a, b) in ud_edges {
            graph.add_udedge(a, b)?;
        }
        Ok(graph)
    }

    pub fn mixed(
        vertices: &[&str],
        di_edges: &[(&str, &str)],
        bi_edges: &[(&str, &str)],
        ud_edges: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Mixed, vertices, di_edges, bi_edges, ud_edges)
    }

    pub fn dag(vertices: &[&str], di_edges: &[(&str, &str)]) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Dag, vertices, di_edges, &[], &[])
    }

    pub fn admg(
        vertices: &[&str],
        di_edges: &[(&str, &str)],
        bi_edges: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Admg, vertices, di_edges, bi_edges, &[])
    }

    pub fn cg(
        vertices: &[&str],
        di_edges: &[(&str, &str)],
        ud_edges: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Cg, vertices, di_edges, &[], ud_edges)
    }

    pub fn ug(vertices: &[&str], ud_edges: &[(&str, &str)]) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Ug, vertices, &[], &[], ud_edges)
    }

    pub fn sg(
        vertices: &[&str],
        di_edges: &[(&str, &str)],
        bi_edges: &[(&str, &str)],
        ud_edges: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Sg, vertices, di_edges, bi_edges, ud_edges)
    }

    pub fn bg(vertices: &[&str], bi_edges: &[(&str, &str)]) -> Result<Self, GraphError> {
        Self::from_edges(GraphKind::Bg, vertices, &[], bi_edges, &[])
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Copy of this graph under another kind, revalidating every edge.
    pub fn as_kind(&self, kind: GraphKind) -> Result<Self, GraphError> {
        let mut graph = Self::new(kind);
        for vertex in self.vertices() {
            graph.add_vertex_with(vertex.clone())?;
        }
        for edge in self.edges() {
            graph.add_edge(edge.edge, &edge.from, &edge.to)?;
        }
        Ok(graph)
    }

    // --- vertices -----------------------------------------------------------

    pub fn add_vertex(&mut self, name: &str) -> Result<(), GraphError> {
        self.add_vertex_with(Vertex::new(name))
    }

    pub fn add_vertex_with(&mut self, vertex: Vertex) -> Result<(), GraphError> {
        if self.node_index.contains_key(&vertex.name) {
            return Err(GraphError::DuplicateVertex { name: vertex.name });
        }
        let name = vertex.name.clone();
        let idx = self.graph.add_node(vertex);
        self.node_index.insert(name, idx);
        Ok(())
    }

    pub fn vertex(&self, name: &str) -> Option<&Vertex> {
        self.node_index
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub(crate) fn vertex_mut(&mut self, name: &str) -> Option<&mut Vertex> {
        let idx = *self.node_index.get(name)?;
        self.graph.node_weight_mut(idx)
    }

    /// Vertices in name order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.node_index
            .values()
            .filter_map(|&idx| self.graph.node_weight(idx))
    }

    pub fn vertex_names(&self) -> VertexSet {
        self.node_index.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertices that are not fixed.
    pub fn random_vertices(&self) -> VertexSet {
        self.vertices()
            .filter(|v| !v.fixed)
            .map(|v| v.name.clone())
            .collect()
    }

    /// Vertices that are fixed.
    pub fn fixed(&self) -> VertexSet {
        self.vertices()
            .filter(|v| v.fixed)
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn is_fixed(&self, name: &str) -> bool {
        self.vertex(name).is_some_and(|v| v.fixed)
    }

    // --- edges --------------------------------------------------------------

    pub fn add_diedge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.add_edge(EdgeType::Directed, from, to)
    }

    pub fn add_biedge(&mut self, a: &str, b: &str) -> Result<(), GraphError> {
        self.add_edge(EdgeType::Bidirected, a, b)
    }

    pub fn add_udedge(&mut self, a: &str, b: &str) -> Result<(), GraphError> {
        self.add_edge(EdgeType::Undirected, a, b)
    }

    /// Add an edge of any type. Fails without modifying the graph when the
    /// kind forbids the edge or the edge breaks acyclicity or segregation.
    /// Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, edge: EdgeType, a: &str, b: &str) -> Result<(), GraphError> {
        let permissions = self.kind.permissions();
        let invalid = |reason: String| GraphError::InvalidEdge {
            kind: edge.to_string(),
            from: a.to_string(),
            to: b.to_string(),
            reason,
        };

        if !permissions.allows(edge) {
            return Err(invalid(format!("a {} has no {edge} edges", self.kind)));
        }
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if ia == ib {
            return Err(invalid("self-loops are not allowed".to_string()));
        }
        if self.find_edge(ia, ib, edge).is_some() {
            return Ok(());
        }

        if permissions.segregated {
            let conflicting = match edge {
                EdgeType::Bidirected => Some(EdgeType::Undirected),
                EdgeType::Undirected => Some(EdgeType::Bidirected),
                EdgeType::Directed => None,
            };
            if let Some(other) = conflicting {
                for (name, idx) in [(a, ia), (b, ib)] {
                    if !self.linked(idx, other, None).is_empty() {
                        return Err(invalid(format!(
                            "{name} would have both siblings and neighbors"
                        )));
                    }
                }
            }
        }

        match (permissions.acyclicity, edge) {
            (Acyclicity::Directed, EdgeType::Directed) => {
                if acyclicity::would_create_cycle(self, ia, ib) {
                    return Err(invalid("creates a directed cycle".to_string()));
                }
                self.insert_edge(edge, ia, ib);
            }
            (Acyclicity::PartiallyDirected, EdgeType::Directed | EdgeType::Undirected) => {
                let inserted = self.insert_edge(edge, ia, ib);
                if let Some(cycle) = acyclicity::find_partially_directed_cycles(self)
                    .into_iter()
                    .next()
                {
                    self.graph.remove_edge(inserted);
                    return Err(invalid(format!(
                        "creates a partially directed cycle through {}",
                        causa_core::errors::format_vertex_set(&cycle)
                    )));
                }
            }
            _ => {
                self.insert_edge(edge, ia, ib);
            }
        }
        Ok(())
    }

    pub fn delete_diedge(&mut self, from: &str, to: &str) -> Result<bool, GraphError> {
        self.delete_edge(EdgeType::Directed, from, to)
    }

    pub fn delete_biedge(&mut self, a: &str, b: &str) -> Result<bool, GraphError> {
        self.delete_edge(EdgeType::Bidirected, a, b)
    }

    pub fn delete_udedge(&mut self, a: &str, b: &str) -> Result<bool, GraphError> {
        self.delete_edge(EdgeType::Undirected, a, b)
    }

    /// Remove an edge. Returns whether it existed.
    pub fn delete_edge(&mut self, edge: EdgeType, a: &str, b: &str) -> Result<bool, GraphError> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        Ok(match self.find_edge(ia, ib, edge) {
            Some(e) => self.graph.remove_edge(e).is_some(),
            None => false,
        })
    }

    pub fn has_diedge(&self, from: &str, to: &str) -> bool {
        self.has_edge(EdgeType::Directed, from, to)
    }

    pub fn has_biedge(&self, a: &str, b: &str) -> bool {
        self.has_edge(EdgeType::Bidirected, a, b)
    }

    pub fn has_udedge(&self, a: &str, b: &str) -> bool {
        self.has_edge(EdgeType::Undirected, a, b)
    }

    pub fn has_edge(&self, edge: EdgeType, a: &str, b: &str) -> bool {
        match (self.node_index.get(a), self.node_index.get(b)) {
            (Some(&ia), Some(&ib)) => self.find_edge(ia, ib, edge).is_some(),
            _ => false,
        }
    }

    /// Whether any edge joins `a` and `b`.
    pub fn adjacent(&self, a: &str, b: &str) -> bool {
        self.has_diedge(a, b)
            || self.has_diedge(b, a)
            || self.has_biedge(a, b)
            || self.has_udedge(a, b)
    }

    /// All edges, sorted.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .graph
            .edge_references()
            .map(|e| Edge {
                edge: *e.weight(),
                from: self.graph[e.source()].name.clone(),
                to: self.graph[e.target()].name.clone(),
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn di_edges(&self) -> Vec<(String, String)> {
        self.edges_of(EdgeType::Directed)
    }

    pub fn bi_edges(&self) -> Vec<(String, String)> {
        self.edges_of(EdgeType::Bidirected)
    }

    pub fn ud_edges(&self) -> Vec<(String, String)> {
        self.edges_of(EdgeType::Undirected)
    }

    fn edges_of(&self, edge: EdgeType) -> Vec<(String, String)> {
        self.edges()
            .into_iter()
            .filter(|e| e.edge == edge)
            .map(|e| (e.from, e.to))
            .collect()
    }

    // --- internals ----------------------------------------------------------

    pub(crate) fn inner(&self) -> &MixedStableGraph {
        &self.graph
    }

    pub(crate) fn index_of(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownVertex {
                name: name.to_string(),
            })
    }

    /// Indices of the known names among `vertices`; unknown names are skipped.
    pub(crate) fn indices<S: AsRef<str>>(
        &self,
        vertices: impl IntoIterator<Item = S>,
    ) -> Vec<NodeIndex> {
        vertices
            .into_iter()
            .filter_map(|v| self.node_index.get(v.as_ref()).copied())
            .collect()
    }

    pub(crate) fn name_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].name
    }

    pub(crate) fn names(&self, indices: impl IntoIterator<Item = NodeIndex>) -> VertexSet {
        indices
            .into_iter()
            .map(|idx| self.name_of(idx).to_string())
            .collect()
    }

    /// Insert without validation. Callers guarantee the kind's invariants.
    pub(crate) fn insert_edge(&mut self, edge: EdgeType, a: NodeIndex, b: NodeIndex) -> EdgeIndex {
        let (source, target) =
            if edge.is_symmetric() && self.graph[a].name > self.graph[b].name {
                (b, a)
            } else {
                (a, b)
            };
        self.graph.add_edge(source, target, edge)
    }

    /// Insert by name without validation, skipping duplicates.
    pub(crate) fn insert_edge_by_name(
        &mut self,
        edge: EdgeType,
        a: &str,
        b: &str,
    ) -> Result<(), GraphError> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if self.find_edge(ia, ib, edge).is_none() {
            self.insert_edge(edge, ia, ib);
        }
        Ok(())
    }

    pub(crate) fn find_edge(&self, a: NodeIndex, b: NodeIndex, edge: EdgeType) -> Option<EdgeIndex> {
        let forward = self
            .graph
            .edges_directed(a, Direction::Outgoing)
            .find(|e| e.target() == b && *e.weight() == edge)
            .map(|e| e.id());
        if forward.is_some() || !edge.is_symmetric() {
            return forward;
        }
        self.graph
            .edges_directed(b, Direction::Outgoing)
            .find(|e| e.target() == a && *e.weight() == edge)
            .map(|e| e.id())
    }

    /// Endpoints linked to `idx` by edges of one type. `direction` selects
    /// outgoing (children) or incoming (parents); `None` takes both.
    pub(crate) fn linked(
        &self,
        idx: NodeIndex,
        edge: EdgeType,
        direction: Option<Direction>,
    ) -> Vec<NodeIndex> {
        let directions: &[Direction] = match direction {
            Some(Direction::Outgoing) => &[Direction::Outgoing],
            Some(Direction::Incoming) => &[Direction::Incoming],
            None => &[Direction::Outgoing, Direction::Incoming],
        };
        let mut out = Vec::new();
        for &dir in directions {
            for e in self.graph.edges_directed(idx, dir) {
                if *e.weight() == edge {
                    let other = if e.source() == idx { e.target() } else { e.source() };
                    out.push(other);
                }
            }
        }
        out
    }

    pub(crate) fn remove_edge_index(&mut self, edge: EdgeIndex) {
        self.graph.remove_edge(edge);
    }

    /// Remove every edge of `edge` type incident to `idx` in `direction`.
    pub(crate) fn remove_linked(&mut self, idx: NodeIndex, edge: EdgeType, direction: Option<Direction>) {
        let directions: &[Direction] = match direction {
            Some(Direction::Outgoing) => &[Direction::Outgoing],
            Some(Direction::Incoming) => &[Direction::Incoming],
            None => &[Direction::Outgoing, Direction::Incoming],
        };
        let mut doomed = Vec::new();
        for &dir in directions {
            doomed.extend(
                self.graph
                    .edges_directed(idx, dir)
                    .filter(|e| *e.weight() == edge)
                    .map(|e| e.id()),
            );
        }
        for e in doomed {
            self.graph.remove_edge(e);
        }
    }

    /// Connected components through edges of one type, over the vertices
    /// accepted by `keep`.
    pub(crate) fn components(&self, edge: EdgeType, keep: impl Fn(&Vertex) -> bool) -> Vec<VertexSet> {
        let mut seen: BTreeSet<NodeIndex> = BTreeSet::new();
        let mut components = Vec::new();
        for &idx in self.node_index.values() {
            if seen.contains(&idx) || !keep(&self.graph[idx]) {
                continue;
            }
            let component = self.reach(vec![idx], edge, None, &keep);
            seen.extend(component.iter().copied());
            components.push(self.names(component));
        }
        components.sort();
        components
    }

    /// Vertices reachable from `starts` through edges of one type,
    /// including the starts, never leaving the vertices accepted by `keep`.
    pub(crate) fn reach(
        &self,
        starts: Vec<NodeIndex>,
        edge: EdgeType,
        direction: Option<Direction>,
        keep: &impl Fn(&Vertex) -> bool,
    ) -> BTreeSet<NodeIndex> {
        let mut visited: BTreeSet<NodeIndex> = starts.iter().copied().collect();
        let mut stack = starts;
        while let Some(idx) = stack.pop() {
            for next in self.linked(idx, edge, direction) {
                if keep(&self.graph[next]) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        visited
    }
}
