//! Intrinsic sets of an ADMG (or CADMG) and their Hasse diagram.
//!
//! A set is intrinsic when it is a district of some reachable CADMG. The
//! sets are enumerated by the fixing procedure: starting from the random
//! vertices, every reachable set contributes its districts, and every
//! fixable vertex of its CADMG leads to a smaller reachable set. Each step
//! removes one vertex, so the search terminates.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::graph::{Graph, VertexSet};

/// Intrinsic sets of a graph with a valid fixing order for each.
#[derive(Debug, Clone)]
pub struct IntrinsicGraph {
    graph: Graph,
    sets: BTreeMap<VertexSet, Vec<String>>,
}

impl IntrinsicGraph {
    pub fn new(graph: &Graph) -> Self {
        let sets = enumerate_intrinsic_sets(graph);
        debug!(count = sets.len(), "enumerated intrinsic sets");
        Self {
            graph: graph.clone(),
            sets,
        }
    }

    /// All intrinsic sets, sorted.
    pub fn intrinsic_sets(&self) -> Vec<VertexSet> {
        self.sets.keys().cloned().collect()
    }

    pub fn is_intrinsic(&self, set: &VertexSet) -> bool {
        self.sets.contains_key(set)
    }

    /// A valid order fixing every random vertex outside `set`, if `set` is
    /// intrinsic.
    pub fn fixing_order(&self, set: &VertexSet) -> Option<&[String]> {
        self.sets.get(set).map(Vec::as_slice)
    }

    /// Head and tail of every intrinsic set. The head is the set of
    /// vertices with no other descendant in the set; the tail is the rest
    /// of the set plus its parents.
    pub fn heads_tails(&self) -> Vec<(VertexSet, VertexSet)> {
        self.sets
            .keys()
            .map(|set| {
                let head: VertexSet = set
                    .iter()
                    .filter(|v| {
                        self.graph
                            .descendants([*v])
                            .intersection(set)
                            .all(|d| d == *v)
                    })
                    .cloned()
                    .collect();
                let mut tail: VertexSet = set.difference(&head).cloned().collect();
                tail.extend(self.graph.parents(set).into_iter().filter(|p| !set.contains(p)));
                (head, tail)
            })
            .collect()
    }

    /// Hasse diagram of the intrinsic sets under inclusion, as
    /// `(subset, superset)` edges with nothing intrinsic strictly between.
    pub fn hasse_diagram(&self) -> Vec<(VertexSet, VertexSet)> {
        let sets: Vec<&VertexSet> = self.sets.keys().collect();
        let strict = |a: &VertexSet, b: &VertexSet| a.len() < b.len() && a.is_subset(b);
        let mut edges = Vec::new();
        for small in &sets {
            for large in &sets {
                if !strict(small, large) {
                    continue;
                }
                let covered = sets
                    .iter()
                    .any(|mid| strict(small, mid) && strict(mid, large));
                if !covered {
                    edges.push(((*small).clone(), (*large).clone()));
                }
            }
        }
        edges
    }
}

fn enumerate_intrinsic_sets(graph: &Graph) -> BTreeMap<VertexSet, Vec<String>> {
    let mut sets: BTreeMap<VertexSet, Vec<String>> = BTreeMap::new();
    let start = graph.random_vertices();
    let mut visited: BTreeSet<VertexSet> = BTreeSet::from([start.clone()]);
    let mut queue: VecDeque<(VertexSet, Vec<String>, Graph)> =
        VecDeque::from([(start, Vec::new(), graph.clone())]);

    while let Some((reachable, path, cadmg)) = queue.pop_front() {
        for district in cadmg.districts() {
            if sets.contains_key(&district) {
                continue;
            }
            let rest: VertexSet = reachable.difference(&district).cloned().collect();
            let (ok, order) = cadmg.fixable(&rest);
            if ok {
                let mut full = path.clone();
                full.extend(order);
                sets.insert(district, full);
            }
        }

        for v in &reachable {
            if !cadmg.is_fixable(v) {
                continue;
            }
            let mut smaller = reachable.clone();
            smaller.remove(v);
            if smaller.is_empty() || !visited.insert(smaller.clone()) {
                continue;
            }
            let mut next = cadmg.clone();
            if next.fix([v]).is_ok() {
                let mut next_path = path.clone();
                next_path.push(v.clone());
                queue.push_back((smaller, next_path, next));
            }
        }
    }
    sets
}
