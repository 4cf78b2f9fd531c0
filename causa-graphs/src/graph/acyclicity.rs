//! Cycle detection run before every edge insertion.
//! Rejects any directed edge that closes a directed cycle, and any directed
//! or undirected edge that closes a partially directed cycle.

use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::{Dfs, EdgeFiltered};

use crate::kind::EdgeType;

use super::{Graph, VertexSet};

/// Check whether adding `source -> target` would create a directed cycle.
///
/// Returns `true` if a cycle would be created (edge should be rejected).
pub fn would_create_cycle(graph: &Graph, source: NodeIndex, target: NodeIndex) -> bool {
    if source == target {
        return true;
    }
    // A cycle appears iff target already reaches source.
    has_directed_path(graph, target, source)
}

/// DFS reachability along directed edges only.
fn has_directed_path(graph: &Graph, from: NodeIndex, to: NodeIndex) -> bool {
    let directed = EdgeFiltered::from_fn(graph.inner(), |e| *e.weight() == EdgeType::Directed);
    let mut dfs = Dfs::new(&directed, from);
    while let Some(node) = dfs.next(&directed) {
        if node == to {
            return true;
        }
    }
    false
}

/// Directed cycles, as the vertex sets of strongly connected components of
/// the directed part with more than one vertex.
pub fn find_cycles(graph: &Graph) -> Vec<VertexSet> {
    let components: Vec<VertexSet> = graph
        .vertex_names()
        .into_iter()
        .map(|v| VertexSet::from([v]))
        .collect();
    condensed_cycles(graph, &components)
}

/// Partially directed cycles. Undirected components (blocks over all
/// vertices) are collapsed into single nodes; a directed edge inside a
/// block, or a directed cycle between blocks, is a partially directed cycle.
pub fn find_partially_directed_cycles(graph: &Graph) -> Vec<VertexSet> {
    let blocks = graph.components(EdgeType::Undirected, |_| true);
    condensed_cycles(graph, &blocks)
}

fn condensed_cycles(graph: &Graph, components: &[VertexSet]) -> Vec<VertexSet> {
    let mut component_of: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, component) in components.iter().enumerate() {
        for v in component {
            component_of.insert(v.as_str(), i);
        }
    }

    let mut condensed: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<_> = (0..components.len()).map(|i| condensed.add_node(i)).collect();
    let mut cycles = Vec::new();
    for (from, to) in graph.di_edges() {
        let (Some(&a), Some(&b)) = (component_of.get(from.as_str()), component_of.get(to.as_str()))
        else {
            continue;
        };
        if a == b {
            cycles.push(components[a].clone());
        } else {
            condensed.add_edge(nodes[a], nodes[b], ());
        }
    }

    for scc in tarjan_scc(&condensed) {
        if scc.len() > 1 {
            let mut cycle = VertexSet::new();
            for node in scc {
                cycle.extend(components[condensed[node]].iter().cloned());
            }
            cycles.push(cycle);
        }
    }
    cycles.sort();
    cycles.dedup();
    cycles
}
