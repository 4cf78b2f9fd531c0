//! m-separation and m-connecting paths.
//!
//! A path is m-connecting given `Z` when every collider on it is an
//! ancestor of `Z` and every non-collider is outside `Z`. A vertex is a
//! collider on a path when both adjacent edges have an arrowhead at it.

use std::collections::{BTreeSet, VecDeque};

use petgraph::Direction;

use causa_core::errors::GraphError;

use crate::graph::{Edge, Graph, VertexSet};
use crate::kind::EdgeType;

/// One way of leaving a vertex along an incident edge.
struct Step {
    to: String,
    edge: Edge,
    head_at_from: bool,
    head_at_to: bool,
}

impl Graph {
    fn steps(&self, vertex: &str) -> Vec<Step> {
        let Ok(idx) = self.index_of(vertex) else {
            return Vec::new();
        };
        let mut steps = Vec::new();
        let mut push = |other: &str, edge: EdgeType, head_at_from: bool, head_at_to: bool| {
            let (from, to) = match edge {
                EdgeType::Directed if head_at_to => (vertex, other),
                EdgeType::Directed => (other, vertex),
                _ if vertex <= other => (vertex, other),
                _ => (other, vertex),
            };
            steps.push(Step {
                to: other.to_string(),
                edge: Edge {
                    edge,
                    from: from.to_string(),
                    to: to.to_string(),
                },
                head_at_from,
                head_at_to,
            });
        };
        for child in self.linked(idx, EdgeType::Directed, Some(Direction::Outgoing)) {
            push(self.name_of(child), EdgeType::Directed, false, true);
        }
        for parent in self.linked(idx, EdgeType::Directed, Some(Direction::Incoming)) {
            push(self.name_of(parent), EdgeType::Directed, true, false);
        }
        for sibling in self.linked(idx, EdgeType::Bidirected, None) {
            push(self.name_of(sibling), EdgeType::Bidirected, true, true);
        }
        for neighbor in self.linked(idx, EdgeType::Undirected, None) {
            push(self.name_of(neighbor), EdgeType::Undirected, false, false);
        }
        steps
    }

    /// Whether `x` and `y` are m-separated given `given`.
    pub fn m_separated<S: AsRef<str>>(
        &self,
        x: &str,
        y: &str,
        given: impl IntoIterator<Item = S>,
    ) -> Result<bool, GraphError> {
        self.index_of(x)?;
        self.index_of(y)?;
        let given: VertexSet = given.into_iter().map(|v| v.as_ref().to_string()).collect();
        if given.contains(x) || given.contains(y) {
            return Ok(true);
        }
        let ancestors_of_given = self.ancestors(&given);

        // States are (vertex, entered through an arrowhead).
        let mut visited: BTreeSet<(String, bool)> = BTreeSet::new();
        let mut queue: VecDeque<(String, bool)> = self
            .steps(x)
            .into_iter()
            .map(|s| (s.to, s.head_at_to))
            .collect();
        while let Some((vertex, head_in)) = queue.pop_front() {
            if vertex == y {
                return Ok(false);
            }
            if !visited.insert((vertex.clone(), head_in)) {
                continue;
            }
            for step in self.steps(&vertex) {
                let open = if head_in && step.head_at_from {
                    ancestors_of_given.contains(&vertex)
                } else {
                    !given.contains(&vertex)
                };
                if open {
                    queue.push_back((step.to, step.head_at_to));
                }
            }
        }
        Ok(true)
    }

    /// Every simple m-connecting path between `x` and `y` given `given`,
    /// as the sequence of edges walked.
    pub fn m_connecting_paths<S: AsRef<str>>(
        &self,
        x: &str,
        y: &str,
        given: impl IntoIterator<Item = S>,
    ) -> Result<Vec<Vec<Edge>>, GraphError> {
        self.index_of(x)?;
        self.index_of(y)?;
        let given: VertexSet = given.into_iter().map(|v| v.as_ref().to_string()).collect();
        let ancestors_of_given = self.ancestors(&given);

        let mut paths = Vec::new();
        if given.contains(x) || given.contains(y) {
            return Ok(paths);
        }
        let mut on_path = VertexSet::from([x.to_string()]);
        let mut edges = Vec::new();
        self.walk_m_paths(
            x,
            None,
            y,
            &given,
            &ancestors_of_given,
            &mut on_path,
            &mut edges,
            &mut paths,
        );
        Ok(paths)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_m_paths(
        &self,
        vertex: &str,
        head_in: Option<bool>,
        y: &str,
        given: &VertexSet,
        ancestors_of_given: &VertexSet,
        on_path: &mut VertexSet,
        edges: &mut Vec<Edge>,
        paths: &mut Vec<Vec<Edge>>,
    ) {
        for step in self.steps(vertex) {
            if on_path.contains(&step.to) {
                continue;
            }
            if let Some(head_in) = head_in {
                let open = if head_in && step.head_at_from {
                    ancestors_of_given.contains(vertex)
                } else {
                    !given.contains(vertex)
                };
                if !open {
                    continue;
                }
            }
            edges.push(step.edge.clone());
            if step.to == y {
                paths.push(edges.clone());
            } else {
                on_path.insert(step.to.clone());
                self.walk_m_paths(
                    &step.to,
                    Some(step.head_at_to),
                    y,
                    given,
                    ancestors_of_given,
                    on_path,
                    edges,
                    paths,
                );
                on_path.remove(&step.to);
            }
            edges.pop();
        }
    }
}
