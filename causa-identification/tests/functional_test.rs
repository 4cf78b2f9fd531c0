//! Construction, simplification, rendering and visiting of functionals.

use std::sync::Arc;

use causa_graphs::{Graph, VertexSet};
use causa_identification::{expand_kernels, Functional, FunctionalVisitor, Kernel};

fn none() -> VertexSet {
    VertexSet::new()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn conditioning_set_excludes_the_variables() {
    let p = Functional::prob(["A", "B"], ["B", "C"]);
    assert_eq!(p.to_string(), "p(A, B | C)");
}

#[test]
fn products_and_sums_flatten() {
    let p = Functional::product([
        Functional::prob(["A"], none()),
        Functional::product([Functional::prob(["B"], ["A"]), Functional::prob(["C"], ["B"])]),
    ]);
    assert!(matches!(p, Functional::Product(ref f) if f.len() == 3));
    assert_eq!(Functional::product([]), Functional::Constant(1.0));
    assert_eq!(Functional::add([]), Functional::Constant(0.0));

    let body = Functional::prob(["A"], none());
    let empty: [&str; 0] = [];
    assert_eq!(Functional::sum(empty, body.clone()), body);
}

// =============================================================================
// Simplification
// =============================================================================

#[test]
fn marginalizing_a_joint_drops_the_summed_vertices() {
    let s = Functional::sum(["B"], Functional::prob(["A", "B"], none())).simplify();
    assert_eq!(s, Functional::prob(["A"], none()));

    let total = Functional::sum(["A", "B"], Functional::prob(["A", "B"], none())).simplify();
    assert!(total.is_one());
}

#[test]
fn ratio_of_joint_and_marginal_is_a_conditional() {
    let r = Functional::ratio(
        Functional::prob(["A", "B"], none()),
        Functional::prob(["B"], none()),
    )
    .simplify();
    assert_eq!(r, Functional::prob(["A"], ["B"]));
}

#[test]
fn zeros_and_ones_are_pruned() {
    let p = Functional::prob(["A"], none());
    assert_eq!(
        Functional::product([Functional::Constant(1.0), p.clone()]).simplify(),
        p
    );
    assert!(Functional::product([Functional::Constant(0.0), p.clone()])
        .simplify()
        .is_zero());
    assert_eq!(
        Functional::add([Functional::Constant(0.0), p.clone()]).simplify(),
        p
    );
    assert_eq!(
        Functional::ratio(p.clone(), Functional::Constant(1.0)).simplify(),
        p
    );
}

#[test]
fn difference_from_zero_negates() {
    let d = Functional::difference(Functional::Constant(0.0), Functional::prob(["A"], none()));
    assert_eq!(d.simplify().to_string(), "-1 p(A)");
}

#[test]
fn binding_a_constant_collapses() {
    let b = Functional::bind("A", 1.0, Functional::Constant(2.0)).simplify();
    assert_eq!(b, Functional::Constant(2.0));
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn composite_forms_render_with_brackets() {
    let f = Functional::product([
        Functional::sum(["B"], Functional::prob(["B"], ["A"])),
        Functional::prob(["C"], none()),
    ]);
    assert_eq!(f.to_string(), "[Σ_{B} p(B | A)] p(C)");

    let r = Functional::ratio(Functional::prob(["A", "B"], none()), Functional::prob(["B"], none()));
    assert_eq!(r.to_string(), "p(A, B) / p(B)");

    let d = Functional::difference(
        Functional::prob(["A"], none()),
        Functional::add([Functional::prob(["B"], none()), Functional::prob(["C"], none())]),
    );
    assert_eq!(d.to_string(), "p(A) - [p(B) + p(C)]");
}

#[test]
fn atoms_render_compactly() {
    let f = Functional::product([
        Functional::Indicator {
            vertex: "A".into(),
            value: 1.0,
        },
        Functional::point_mass(["A", "B"]),
        Functional::Value("Y".into()),
    ]);
    assert_eq!(f.to_string(), "I(A = 1) δ(A, B) Y");
}

#[test]
fn kernels_render_their_fixing_order_last_first() {
    let g = Graph::admg(&["T", "M", "Y"], &[("T", "M"), ("M", "Y")], &[("T", "Y")]).unwrap();
    let kernel = Functional::Kernel(Kernel {
        district: ["Y".to_string()].into_iter().collect(),
        fixing_order: vec!["M".into(), "T".into()],
        experiment: none(),
        graph: Arc::new(g),
    });
    assert_eq!(kernel.to_string(), "Φ_{T, M}(p(V); G)");
}

// =============================================================================
// Visiting
// =============================================================================

/// Counts probability atoms.
struct ProbCounter;

impl FunctionalVisitor for ProbCounter {
    type Output = usize;

    fn visit_prob(&mut self, _: &VertexSet, _: &VertexSet) -> usize {
        1
    }
    fn visit_kernel(&mut self, _: &Kernel) -> usize {
        0
    }
    fn visit_sum(&mut self, _: &VertexSet, body: &Functional) -> usize {
        body.accept(self)
    }
    fn visit_add(&mut self, terms: &[Functional]) -> usize {
        terms.iter().map(|t| t.accept(self)).sum()
    }
    fn visit_product(&mut self, factors: &[Functional]) -> usize {
        factors.iter().map(|f| f.accept(self)).sum()
    }
    fn visit_ratio(&mut self, numerator: &Functional, denominator: &Functional) -> usize {
        numerator.accept(self) + denominator.accept(self)
    }
    fn visit_difference(&mut self, left: &Functional, right: &Functional) -> usize {
        left.accept(self) + right.accept(self)
    }
    fn visit_indicator(&mut self, _: &str, _: f64) -> usize {
        0
    }
    fn visit_point_mass(&mut self, _: &VertexSet) -> usize {
        0
    }
    fn visit_value(&mut self, _: &str) -> usize {
        0
    }
    fn visit_bind(&mut self, _: &str, _: f64, body: &Functional) -> usize {
        body.accept(self)
    }
    fn visit_constant(&mut self, _: f64) -> usize {
        0
    }
}

#[test]
fn custom_visitors_walk_the_tree() {
    let f = Functional::bind(
        "A",
        1.0,
        Functional::sum(
            ["B"],
            Functional::product([Functional::prob(["B"], ["A"]), Functional::prob(["C"], ["B"])]),
        ),
    );
    assert_eq!(f.accept(&mut ProbCounter), 2);
}

#[test]
fn expanding_a_front_door_kernel_leaves_observed_probabilities() {
    let g = Graph::admg(&["T", "M", "Y"], &[("T", "M"), ("M", "Y")], &[("T", "Y")]).unwrap();
    let kernel = Functional::Kernel(Kernel {
        district: ["Y".to_string()].into_iter().collect(),
        fixing_order: vec!["M".into(), "T".into()],
        experiment: none(),
        graph: Arc::new(g),
    });
    let expanded = expand_kernels(&kernel).unwrap();
    assert!(!expanded.has_kernels());
    assert!(expanded.accept(&mut ProbCounter) > 0);
}
