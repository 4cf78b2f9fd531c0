//! Districts, fixing, Markov blankets, m-separation, projections, intrinsic
//! sets, missing-data graphs and rendering.

use causa_core::errors::GraphError;
use causa_graphs::missing::role_of;
use causa_graphs::{Graph, IntrinsicGraph, RenderOptions, VertexRole, VertexSet};

fn set(names: &[&str]) -> VertexSet {
    names.iter().map(|s| s.to_string()).collect()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn pillow_graph() -> Graph {
    Graph::admg(
        &["A", "B", "C", "D", "Y"],
        &[("A", "B"), ("B", "C"), ("D", "C"), ("C", "Y")],
        &[("A", "C"), ("B", "Y"), ("B", "D")],
    )
    .unwrap()
}

// =============================================================================
// Districts and fixing
// =============================================================================

#[test]
fn districts_and_district_of_vertex() {
    let g = Graph::admg(
        &["A", "B", "C", "D", "Y"],
        &[("A", "B"), ("A", "D"), ("B", "C"), ("C", "Y"), ("B", "D"), ("D", "Y")],
        &[("A", "C"), ("B", "Y"), ("B", "D")],
    )
    .unwrap();
    assert_eq!(g.districts(), vec![set(&["A", "C"]), set(&["B", "D", "Y"])]);
    assert_eq!(g.district("A"), set(&["A", "C"]));
    assert!(g.district("missing").is_empty());
}

#[test]
fn fixing_removes_incoming_and_bidirected_edges() {
    let mut g = Graph::admg(&["A", "B", "C"], &[("A", "B"), ("B", "C")], &[("B", "C")]).unwrap();
    g.fix(["C"]).unwrap();
    assert!(!g.has_diedge("B", "C"));
    assert!(!g.has_biedge("B", "C"));
    assert!(g.has_diedge("A", "B"));
    assert!(g.is_fixed("C"));
    assert_eq!(g.fixed(), set(&["C"]));
    assert_eq!(g.districts(), vec![set(&["A"]), set(&["B"])]);
}

#[test]
fn fixing_unknown_vertex_fails_without_changes() {
    let mut g = Graph::admg(&["A", "B"], &[("A", "B")], &[]).unwrap();
    assert!(g.fix(["B", "Q"]).is_err());
    assert!(g.fixed().is_empty());
    assert!(g.has_diedge("A", "B"));
}

#[test]
fn fixed_vertices_report_single_fixed_set() {
    let mut g = Graph::admg(
        &["X_1", "X_2", "W", "Y"],
        &[("X_1", "W"), ("W", "Y"), ("X_2", "Y")],
        &[("X_1", "W"), ("X_2", "Y"), ("X_1", "X_2")],
    )
    .unwrap();
    g.fix(["X_1"]).unwrap();
    assert_eq!(g.fixed(), set(&["X_1"]));
}

#[test]
fn sg_fixing_drops_undirected_edges_between_fixed_vertices() {
    let mut g = Graph::sg(&["A", "B", "C"], &[], &[], &[("A", "B"), ("B", "C")]).unwrap();
    g.fix(["A", "B"]).unwrap();
    assert!(!g.has_udedge("A", "B"));
    assert!(g.has_udedge("B", "C"));
}

#[test]
fn fixability_follows_descendants_in_district() {
    let g = Graph::admg(&["A", "B"], &[("A", "B")], &[("A", "B")]).unwrap();
    assert!(!g.is_fixable("A"));
    assert!(g.is_fixable("B"));

    let (ok, order) = g.fixable(["A", "B"]);
    assert!(ok);
    assert_eq!(order, strings(&["B", "A"]));

    let (ok, order) = g.fixable(["A"]);
    assert!(!ok);
    assert!(order.is_empty());
}

#[test]
fn fixable_reports_unknown_vertices_as_unfixable() {
    let g = Graph::admg(&["A"], &[], &[]).unwrap();
    assert_eq!(g.fixable(["Q"]), (false, Vec::new()));
}

#[test]
fn reachable_closure_keeps_unfixable_ancestors() {
    let g = Graph::admg(
        &["A", "B", "C"],
        &[("A", "B"), ("C", "B"), ("C", "A")],
        &[("A", "B")],
    )
    .unwrap();
    let (closure, order, cadmg) = g.reachable_closure(["B"]);
    assert_eq!(closure, set(&["A", "B"]));
    assert_eq!(order, strings(&["C"]));
    assert!(cadmg.is_fixed("C"));
}

// =============================================================================
// Markov blankets and pillows
// =============================================================================

#[test]
fn markov_pillow_under_topological_order() {
    let g = pillow_graph();
    let order = strings(&["D", "A", "B", "C", "Y"]);
    assert!(g.markov_pillow(["A", "D"], &order).is_empty());
    assert_eq!(g.markov_pillow(["C"], &order), set(&["A", "B", "D"]));
}

#[test]
fn markov_blanket_of_sets() {
    let g = pillow_graph();
    assert_eq!(g.markov_blanket(["A", "D"]), set(&["C", "B", "Y"]));
    assert_eq!(g.markov_blanket(["C"]), set(&["A", "B", "D"]));
}

// =============================================================================
// m-separation
// =============================================================================

#[test]
fn chain_is_blocked_by_its_middle() {
    let g = Graph::dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
    assert!(!g.m_separated("A", "C", Vec::<String>::new()).unwrap());
    assert!(g.m_separated("A", "C", ["B"]).unwrap());
}

#[test]
fn colliders_open_when_a_descendant_is_conditioned_on() {
    let g = Graph::admg(&["A", "B", "C", "D"], &[("C", "B"), ("B", "D")], &[("A", "B")]).unwrap();
    assert!(g.m_separated("A", "C", Vec::<String>::new()).unwrap());
    assert!(!g.m_separated("A", "C", ["B"]).unwrap());
    assert!(!g.m_separated("A", "C", ["D"]).unwrap());
    assert!(g.m_separated("A", "Q", ["D"]).is_err());
}

#[test]
fn m_connecting_paths_between_treatment_confounders_and_outcome() {
    let g = Graph::admg(
        &["X1", "U", "X2", "A1", "A2", "Y1", "Y2"],
        &[
            ("X1", "A1"),
            ("X1", "Y1"),
            ("A1", "Y1"),
            ("X2", "A2"),
            ("X2", "Y2"),
            ("A2", "Y2"),
            ("U", "A1"),
            ("U", "Y1"),
            ("U", "A2"),
            ("U", "Y2"),
            ("A2", "Y1"),
            ("A1", "Y2"),
        ],
        &[("X1", "U"), ("U", "X2"), ("X1", "X2"), ("Y1", "Y2")],
    )
    .unwrap();
    let paths = g.m_connecting_paths("X1", "Y2", Vec::<String>::new()).unwrap();
    assert_eq!(paths.len(), 6);
    for path in &paths {
        let last = path.last().unwrap();
        assert_eq!(last.to, "Y2");
    }
    assert!(!g.m_separated("X1", "Y2", Vec::<String>::new()).unwrap());

    // Conditioning on every non-collider blocks all of them.
    let blocked = g
        .m_connecting_paths("X1", "Y2", ["U", "X2", "A1", "A2"])
        .unwrap();
    assert!(blocked.is_empty());
}

// =============================================================================
// Projections
// =============================================================================

#[test]
fn arid_projection_of_a_dag_with_bow() {
    let g = Graph::admg(&["A", "B", "C"], &[("A", "B"), ("B", "C")], &[("B", "C")]).unwrap();
    let arid = g.maximal_arid_projection().unwrap();
    assert_eq!(
        arid.di_edges(),
        vec![
            ("A".to_string(), "B".to_string()),
            ("A".to_string(), "C".to_string()),
            ("B".to_string(), "C".to_string()),
        ]
    );
    assert!(arid.bi_edges().is_empty());
}

#[test]
fn nonparametric_saturation() {
    let vertices = ["Treatment", "M", "L", "Confounders", "Outcome"];
    let di_edges = [
        ("Confounders", "M"),
        ("Confounders", "L"),
        ("Treatment", "M"),
        ("Treatment", "Outcome"),
        ("Treatment", "L"),
        ("M", "L"),
        ("L", "Outcome"),
    ];
    let g1 = Graph::admg(
        &vertices,
        &di_edges,
        &[("Treatment", "Confounders"), ("M", "Outcome"), ("L", "Outcome")],
    )
    .unwrap();
    let g2 = Graph::admg(
        &vertices,
        &di_edges,
        &[("Treatment", "Confounders"), ("M", "Outcome")],
    )
    .unwrap();
    assert!(g1.nonparametric_saturated().unwrap());
    assert!(!g2.nonparametric_saturated().unwrap());
}

#[test]
fn mb_shielded_detects_unshielded_blanket_members() {
    // A -> B <-> C: C is in the blanket of B's district but A and C are not adjacent.
    let unshielded = Graph::admg(&["A", "B", "C"], &[("A", "B")], &[("B", "C")]).unwrap();
    assert!(!unshielded.mb_shielded());

    let chain = Graph::dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
    assert!(chain.mb_shielded());
}

#[test]
fn latent_projection_marginalises_hidden_vertices() {
    // A -> U -> Y, U -> M: projecting out U gives A -> Y, A -> M and M <-> Y.
    let g = Graph::dag(&["A", "U", "M", "Y"], &[("A", "U"), ("U", "Y"), ("U", "M")]).unwrap();
    let projected = g.latent_projection(["A", "M", "Y"]).unwrap();
    assert_eq!(projected.vertex_names(), set(&["A", "M", "Y"]));
    assert!(projected.has_diedge("A", "Y"));
    assert!(projected.has_diedge("A", "M"));
    assert!(projected.has_biedge("M", "Y"));
    assert!(!projected.has_biedge("A", "M"));
}

#[test]
fn latent_projection_of_front_door_confounder() {
    let g = Graph::dag(
        &["U", "T", "M", "Y"],
        &[("U", "T"), ("U", "Y"), ("T", "M"), ("M", "Y")],
    )
    .unwrap();
    let projected = g.latent_projection(["T", "M", "Y"]).unwrap();
    assert_eq!(
        projected.bi_edges(),
        vec![("T".to_string(), "Y".to_string())]
    );
    assert_eq!(projected.di_edges().len(), 2);
    assert!(g.latent_projection(["T", "Q"]).is_err());
}

// =============================================================================
// Intrinsic sets
// =============================================================================

#[test]
fn intrinsic_sets_of_complete_bidirected_graph() {
    let g = Graph::admg(&["A", "B", "C"], &[], &[("A", "B"), ("B", "C"), ("A", "C")]).unwrap();
    let ig = IntrinsicGraph::new(&g);
    assert_eq!(ig.intrinsic_sets().len(), 7);
    assert!(ig.is_intrinsic(&set(&["A", "C"])));
}

#[test]
fn intrinsic_set_fixing_order() {
    let g = Graph::admg(&["A", "B", "C"], &[("A", "B")], &[("B", "C"), ("A", "C")]).unwrap();
    let ig = IntrinsicGraph::new(&g);
    assert_eq!(
        ig.fixing_order(&set(&["B"])).unwrap(),
        strings(&["C", "A"]).as_slice()
    );
    assert!(ig.fixing_order(&set(&["A", "B"])).is_none());
}

#[test]
fn intrinsic_sets_of_a_cadmg() {
    let mut g = Graph::admg(&["A", "B", "C"], &[("A", "B")], &[("B", "C"), ("A", "C")]).unwrap();
    g.fix(["B"]).unwrap();
    let ig = IntrinsicGraph::new(&g);
    assert_eq!(
        ig.intrinsic_sets(),
        vec![set(&["A"]), set(&["A", "C"]), set(&["C"])]
    );
}

#[test]
fn intrinsic_sets_of_a_dag_are_singletons() {
    let g = Graph::dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]).unwrap();
    let ig = IntrinsicGraph::new(&g);
    assert_eq!(ig.intrinsic_sets(), vec![set(&["A"]), set(&["B"]), set(&["C"])]);
    assert!(ig.hasse_diagram().is_empty());
}

#[test]
fn heads_and_tails() {
    let g = Graph::admg(
        &["A", "B", "C", "D"],
        &[("A", "B"), ("B", "C"), ("C", "D")],
        &[("A", "C"), ("A", "D")],
    )
    .unwrap();
    let ig = IntrinsicGraph::new(&g);
    let heads_tails = ig.heads_tails();
    let (_, tail) = heads_tails
        .iter()
        .find(|(head, _)| *head == set(&["D"]))
        .unwrap();
    assert_eq!(tail, &set(&["C"]));
    // {A, C, D}: D is the only barren vertex.
    let acd = heads_tails
        .iter()
        .find(|(head, tail)| *head == set(&["D"]) && tail.contains("A"));
    assert!(acd.is_some());
}

#[test]
fn hasse_diagram_links_immediate_supersets() {
    let g = Graph::admg(&["A", "B", "C"], &[("A", "B")], &[("B", "C"), ("A", "C")]).unwrap();
    let ig = IntrinsicGraph::new(&g);
    let edges = ig.hasse_diagram();
    assert!(edges.contains(&(set(&["A"]), set(&["A", "C"]))));
    assert!(edges.contains(&(set(&["A", "C"]), set(&["A", "B", "C"]))));
    assert!(!edges.contains(&(set(&["A"]), set(&["A", "B", "C"]))));
}

// =============================================================================
// Missing-data graphs
// =============================================================================

#[test]
fn missing_admg_assigns_roles_and_proxy_edges() {
    let g = Graph::missing_admg(
        &["X_1", "X_2", "R_1", "R_2", "Xp_1"],
        &[("X_1", "R_2")],
        &[],
    )
    .unwrap();
    assert_eq!(g.indicators(), set(&["R_1", "R_2"]));
    assert_eq!(g.counterfactuals(), set(&["X_1", "X_2"]));
    assert_eq!(g.proxies(), set(&["Xp_1"]));
    assert!(g.has_diedge("X_1", "Xp_1"));
    assert!(g.has_diedge("R_1", "Xp_1"));
    // No proxy for X_2, so no proxy edges.
    assert_eq!(g.children(["R_2"]), VertexSet::new());
    assert_eq!(g.counterfactual_of("R_1").as_deref(), Some("X_1"));
    assert_eq!(g.indicator_of("X_2").as_deref(), Some("R_2"));
    assert_eq!(g.vertex("Xp_1").map(|v| v.role), Some(VertexRole::Proxy));
}

#[test]
fn proxy_view_renames_counterfactuals_with_indicators() {
    let mut g = Graph::missing_admg(
        &["X_1", "X_2", "R_1", "Xp_1"],
        &[("X_1", "X_2"), ("X_2", "R_1")],
        &[],
    )
    .unwrap();
    g.fix(["R_1"]).unwrap();
    let view = g.proxy_view().unwrap();
    assert_eq!(view.vertex_names(), set(&["R_1", "X_2", "Xp_1"]));
    assert!(view.has_diedge("Xp_1", "X_2"));
    assert!(view.is_fixed("R_1"));
    assert!(view.children(["R_1"]).is_empty());
    assert_eq!(g.observed_name("X_1"), "Xp_1");
    assert_eq!(g.observed_name("X_2"), "X_2");
}

#[test]
fn missing_admg_rejects_proxy_without_indicator() {
    let err = Graph::missing_admg(&["X_1", "Xp_1"], &[], &[]).unwrap_err();
    assert!(matches!(err, GraphError::StructuralInvariant { .. }));
    assert!(err.to_string().contains("Xp_1"));
}

#[test]
fn roles_follow_naming_convention() {
    assert_eq!(role_of("Xp_3"), VertexRole::Proxy);
    assert_eq!(role_of("X_3"), VertexRole::Counterfactual);
    assert_eq!(role_of("R_3"), VertexRole::MissingnessIndicator);
    assert_eq!(role_of("Age"), VertexRole::Random);
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn dot_rendering_styles_vertices_and_edges() {
    let mut g = Graph::admg(&["A", "B", "C"], &[("A", "B")], &[("B", "C")]).unwrap();
    g.fix(["A"]).unwrap();
    let dot = g.to_dot(&RenderOptions::left_right());
    assert!(dot.starts_with("digraph G {"));
    assert!(dot.contains("rankdir=LR;"));
    assert!(dot.contains("\"A\" [shape=square"));
    assert!(dot.contains("\"B\" [shape=plaintext"));
    assert!(dot.contains("\"A\" -> \"B\" [color=blue];"));
    assert!(dot.contains("\"B\" -> \"C\" [dir=both, color=red];"));
}

#[test]
fn dot_rendering_of_proxies_and_undirected_edges() {
    let g = Graph::missing_admg(&["X_1", "R_1", "Xp_1"], &[], &[]).unwrap();
    let dot = g.to_dot(&RenderOptions::default());
    assert!(!dot.contains("rankdir"));
    assert!(dot.contains("\"X_1\" -> \"Xp_1\" [color=grey];"));

    let ug = Graph::ug(&["A", "B"], &[("A", "B")]).unwrap();
    assert!(ug
        .to_dot(&RenderOptions::default())
        .contains("[dir=none, color=brown]"));
}
