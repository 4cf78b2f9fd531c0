//! Text rendering: `Σ_{B} p(B | A) p(C | B)`.

use causa_graphs::VertexSet;

use super::{Functional, FunctionalVisitor, Kernel};

pub(super) struct DisplayVisitor;

fn join(vertices: &VertexSet) -> String {
    vertices.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn is_atom(f: &Functional) -> bool {
    matches!(
        f,
        Functional::Prob { .. }
            | Functional::Kernel(_)
            | Functional::Indicator { .. }
            | Functional::PointMass { .. }
            | Functional::Value(_)
            | Functional::Constant(_)
    )
}

impl DisplayVisitor {
    fn grouped(&mut self, f: &Functional) -> String {
        let text = f.accept(self);
        if is_atom(f) {
            text
        } else {
            format!("[{text}]")
        }
    }
}

impl FunctionalVisitor for DisplayVisitor {
    type Output = String;

    fn visit_prob(&mut self, vars: &VertexSet, given: &VertexSet) -> String {
        if given.is_empty() {
            format!("p({})", join(vars))
        } else {
            format!("p({} | {})", join(vars), join(given))
        }
    }

    fn visit_kernel(&mut self, kernel: &Kernel) -> String {
        let source = if kernel.experiment.is_empty() {
            "p(V)".to_string()
        } else {
            format!("p(V | do({}))", join(&kernel.experiment))
        };
        if kernel.fixing_order.is_empty() {
            return source;
        }
        let order: Vec<&str> = kernel.fixing_order.iter().rev().map(String::as_str).collect();
        format!("Φ_{{{}}}({source}; G)", order.join(", "))
    }

    fn visit_sum(&mut self, over: &VertexSet, body: &Functional) -> String {
        format!("Σ_{{{}}} {}", join(over), body.accept(self))
    }

    fn visit_add(&mut self, terms: &[Functional]) -> String {
        terms
            .iter()
            .map(|t| t.accept(self))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn visit_product(&mut self, factors: &[Functional]) -> String {
        let last = factors.len().saturating_sub(1);
        factors
            .iter()
            .enumerate()
            .map(|(i, f)| match f {
                // A trailing sum reads unambiguously without brackets.
                Functional::Sum { .. } if i == last => f.accept(self),
                _ => self.grouped(f),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn visit_ratio(&mut self, numerator: &Functional, denominator: &Functional) -> String {
        format!("{} / {}", self.grouped(numerator), self.grouped(denominator))
    }

    fn visit_difference(&mut self, left: &Functional, right: &Functional) -> String {
        let right = match right {
            Functional::Add(_) | Functional::Difference { .. } => self.grouped(right),
            _ => right.accept(self),
        };
        format!("{} - {right}", left.accept(self))
    }

    fn visit_indicator(&mut self, vertex: &str, value: f64) -> String {
        format!("I({vertex} = {value})")
    }

    fn visit_point_mass(&mut self, vertices: &VertexSet) -> String {
        format!("δ({})", join(vertices))
    }

    fn visit_value(&mut self, vertex: &str) -> String {
        vertex.to_string()
    }

    fn visit_bind(&mut self, vertex: &str, value: f64, body: &Functional) -> String {
        format!("[{}]_{{{vertex} = {value}}}", body.accept(self))
    }

    fn visit_constant(&mut self, value: f64) -> String {
        format!("{value}")
    }
}
