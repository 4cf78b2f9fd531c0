//! Property tests for causa-graphs: acyclicity, district partitions,
//! topological orders, subgraphs and intrinsic sets on random ADMGs,
//! including determinism of the intrinsic set lattice.

use std::collections::BTreeSet;

use proptest::prelude::*;

use causa_graphs::graph::acyclicity;
use causa_graphs::{Graph, GraphKind, IntrinsicGraph, VertexSet};

fn name(i: usize) -> String {
    format!("V{i:02}")
}

/// Build a random ADMG, silently skipping edges the graph rejects.
fn build_random_admg(n: usize, di: &[(usize, usize)], bi: &[(usize, usize)]) -> Graph {
    let mut graph = Graph::new(GraphKind::Admg);
    for i in 0..n {
        graph.add_vertex(&name(i)).unwrap();
    }
    for &(a, b) in di {
        let _ = graph.add_diedge(&name(a % n), &name(b % n));
    }
    for &(a, b) in bi {
        let _ = graph.add_biedge(&name(a % n), &name(b % n));
    }
    graph
}

fn edge_strategy(n: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..n, 0..n), 0..n * 2)
}

// =============================================================================
// Directed acyclicity survives any sequence of insertions
// =============================================================================
proptest! {
    #[test]
    fn random_admgs_stay_acyclic(di in edge_strategy(12), bi in edge_strategy(12)) {
        let graph = build_random_admg(12, &di, &bi);
        prop_assert!(acyclicity::find_cycles(&graph).is_empty());
        prop_assert!(graph.topological_sort().is_ok());
    }
}

// =============================================================================
// Rejected insertions leave the graph untouched
// =============================================================================
proptest! {
    #[test]
    fn rejected_edges_change_nothing(di in edge_strategy(8), a in 0_usize..8, b in 0_usize..8) {
        let mut graph = build_random_admg(8, &di, &[]);
        let before = graph.edges();
        if graph.add_diedge(&name(a), &name(b)).is_err() {
            prop_assert_eq!(graph.edges(), before);
        }
    }
}

// =============================================================================
// Districts partition the random vertices
// =============================================================================
proptest! {
    #[test]
    fn districts_partition_random_vertices(di in edge_strategy(10), bi in edge_strategy(10)) {
        let graph = build_random_admg(10, &di, &bi);
        let districts = graph.districts();
        let mut seen = VertexSet::new();
        for district in &districts {
            for v in district {
                prop_assert!(seen.insert(v.clone()), "{} in two districts", v);
                prop_assert_eq!(&graph.district(v), district);
            }
        }
        prop_assert_eq!(seen, graph.random_vertices());
    }
}

// =============================================================================
// Topological orders put parents first
// =============================================================================
proptest! {
    #[test]
    fn topological_order_respects_edges(di in edge_strategy(15)) {
        let graph = build_random_admg(15, &di, &[]);
        let order = graph.topological_sort().unwrap();
        let position = |v: &str| order.iter().position(|o| o == v);
        for (parent, child) in graph.di_edges() {
            prop_assert!(position(&parent) < position(&child));
        }
    }
}

// =============================================================================
// Subgraphs keep exactly the induced edges
// =============================================================================
proptest! {
    #[test]
    fn subgraph_keeps_induced_edges(
        di in edge_strategy(10),
        bi in edge_strategy(10),
        keep in prop::collection::btree_set(0_usize..10, 0..10),
    ) {
        let graph = build_random_admg(10, &di, &bi);
        let keep: VertexSet = keep.into_iter().map(name).collect();
        let sub = graph.subgraph(&keep);
        prop_assert_eq!(sub.vertex_names(), keep.clone());
        for edge in graph.edges() {
            let induced = keep.contains(&edge.from) && keep.contains(&edge.to);
            prop_assert_eq!(sub.edges().contains(&edge), induced);
        }
        prop_assert!(sub.is_subgraph(&graph));
    }
}

// =============================================================================
// Every intrinsic set is a district of the graph its fixing order reaches
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn intrinsic_sets_are_reachable_districts(di in edge_strategy(6), bi in edge_strategy(6)) {
        let graph = build_random_admg(6, &di, &bi);
        let intrinsic = IntrinsicGraph::new(&graph);
        for district in graph.districts() {
            prop_assert!(intrinsic.is_intrinsic(&district));
        }
        for set in intrinsic.intrinsic_sets() {
            let order = intrinsic.fixing_order(&set).unwrap();
            let (ok, _) = graph.fixable(order);
            prop_assert!(ok, "order {:?} for {:?} is not valid", order, set);
            let mut reached = graph.clone();
            reached.fix(order).unwrap();
            let districts: BTreeSet<VertexSet> = reached.districts().into_iter().collect();
            prop_assert!(districts.contains(&set));
        }
    }
}

// =============================================================================
// Intrinsic sets and the Hasse diagram do not depend on the run
// =============================================================================
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn intrinsic_graph_is_deterministic(di in edge_strategy(6), bi in edge_strategy(6)) {
        let graph = build_random_admg(6, &di, &bi);
        let rebuilt = build_random_admg(6, &di, &bi);
        let first = IntrinsicGraph::new(&graph);
        let second = IntrinsicGraph::new(&rebuilt);
        prop_assert_eq!(first.intrinsic_sets(), second.intrinsic_sets());
        prop_assert_eq!(first.hasse_diagram(), second.hasse_diagram());
        prop_assert_eq!(first.heads_tails(), second.heads_tails());
        for set in first.intrinsic_sets() {
            prop_assert_eq!(first.fixing_order(&set), second.fixing_order(&set));
        }
        prop_assert_eq!(IntrinsicGraph::new(&graph).hasse_diagram(), first.hasse_diagram());
    }
}
