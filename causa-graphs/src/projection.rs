//! Projections of an ADMG: the maximal arid projection, which keeps the
//! nested Markov model while removing every non-arid edge pattern, and the
//! latent projection onto a subset of the vertices.

use std::collections::BTreeMap;

use petgraph::Direction;

use causa_core::errors::GraphError;

use crate::graph::{Graph, VertexSet};
use crate::kind::{EdgeType, GraphKind};

impl Graph {
    /// The maximal arid projection.
    ///
    /// `a -> b` when `a` is a parent of the reachable closure of `b`;
    /// otherwise `a <-> b` when the reachable closure of `{a, b}` is a
    /// single district.
    pub fn maximal_arid_projection(&self) -> Result<Graph, GraphError> {
        let vertices: Vec<String> = self.vertex_names().into_iter().collect();
        let closures: BTreeMap<&str, VertexSet> = vertices
            .iter()
            .map(|v| (v.as_str(), self.reachable_closure([v]).0))
            .collect();
        let parent_of_closure = |a: &str, b: &str| {
            closures
                .get(b)
                .is_some_and(|closure| self.parents(closure).contains(a))
        };

        let mut projection = Graph::new(GraphKind::Admg);
        for vertex in self.vertices() {
            projection.add_vertex_with(vertex.clone())?;
        }
        for (i, a) in vertices.iter().enumerate() {
            for b in &vertices[i + 1..] {
                if parent_of_closure(a, b) {
                    projection.add_diedge(a, b)?;
                } else if parent_of_closure(b, a) {
                    projection.add_diedge(b, a)?;
                } else {
                    let (_, _, cadmg) = self.reachable_closure([a, b]);
                    if cadmg.districts().len() == 1 {
                        projection.add_biedge(a, b)?;
                    }
                }
            }
        }
        Ok(projection)
    }

    /// Whether the nested Markov model of the graph is saturated: its
    /// maximal arid projection is a complete graph.
    pub fn nonparametric_saturated(&self) -> Result<bool, GraphError> {
        let projection = self.maximal_arid_projection()?;
        let vertices: Vec<String> = projection.vertex_names().into_iter().collect();
        Ok(vertices.iter().enumerate().all(|(i, a)| {
            vertices[i + 1..]
                .iter()
                .all(|b| projection.adjacent(a, b))
        }))
    }

    /// Whether no pair of non-adjacent vertices has one vertex in the
    /// other's Markov blanket.
    pub fn mb_shielded(&self) -> bool {
        let vertices: Vec<String> = self.vertex_names().into_iter().collect();
        for (i, a) in vertices.iter().enumerate() {
            for b in &vertices[i + 1..] {
                if self.adjacent(a, b) {
                    continue;
                }
                if self.markov_blanket([a]).contains(b) || self.markov_blanket([b]).contains(a) {
                    return false;
                }
            }
        }
        true
    }

    /// Latent projection onto `retained`: every other vertex is treated as
    /// hidden and marginalized.
    ///
    /// `a -> b` when a directed path from `a` to `b` has only hidden
    /// intermediates; `a <-> b` when a path between them has only hidden
    /// non-collider intermediates and arrowheads at both ends.
    pub fn latent_projection<S: AsRef<str>>(
        &self,
        retained: impl IntoIterator<Item = S>,
    ) -> Result<Graph, GraphError> {
        let mut keep = VertexSet::new();
        for v in retained {
            let v = v.as_ref();
            self.index_of(v)?;
            keep.insert(v.to_string());
        }
        let hidden = |v: &crate::vertex::Vertex| !keep.contains(&v.name);

        let mut projection = Graph::new(GraphKind::Admg);
        for vertex in self.vertices().filter(|v| keep.contains(&v.name)) {
            projection.add_vertex_with(vertex.clone())?;
        }

        // Hidden vertices with a hidden directed path into each retained vertex.
        let mut hidden_ancestors: BTreeMap<&str, VertexSet> = BTreeMap::new();
        for v in &keep {
            let idx = self.index_of(v)?;
            let mut reached = self.names(self.reach(
                vec![idx],
                EdgeType::Directed,
                Some(Direction::Incoming),
                &hidden,
            ));
            reached.remove(v);
            hidden_ancestors.insert(v.as_str(), reached);
        }

        for a in &keep {
            let idx = self.index_of(a)?;
            let through_hidden =
                self.reach(vec![idx], EdgeType::Directed, Some(Direction::Outgoing), &hidden);
            let children = self.linked_all(&through_hidden, EdgeType::Directed, Direction::Outgoing);
            for b in children.iter().filter(|b| keep.contains(*b) && *b != a) {
                projection.add_diedge(a, b)?;
            }
        }

        let empty = VertexSet::new();
        let kept: Vec<&String> = keep.iter().collect();
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                let ha = hidden_ancestors.get(a.as_str()).unwrap_or(&empty);
                let hb = hidden_ancestors.get(b.as_str()).unwrap_or(&empty);
                let common_hidden_ancestor = ha.intersection(hb).next().is_some();
                let confounded = common_hidden_ancestor
                    || ha.iter().chain([*a]).any(|x| {
                        hb.iter()
                            .chain([*b])
                            .any(|y| x != y && self.has_biedge(x, y))
                    });
                if confounded {
                    projection.add_biedge(a, b)?;
                }
            }
        }
        Ok(projection)
    }

    fn linked_all(
        &self,
        from: &std::collections::BTreeSet<petgraph::stable_graph::NodeIndex>,
        edge: EdgeType,
        direction: Direction,
    ) -> VertexSet {
        let linked: Vec<_> = from
            .iter()
            .flat_map(|&idx| self.linked(idx, edge, Some(direction)))
            .collect();
        self.names(linked)
    }
}
