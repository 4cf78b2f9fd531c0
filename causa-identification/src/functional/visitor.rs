use causa_graphs::VertexSet;

use super::{Functional, Kernel};

/// One callback per node type. Implementations recurse by calling
/// [`Functional::accept`] on the children they care about.
pub trait FunctionalVisitor {
    type Output;

    fn visit_prob(&mut self, vars: &VertexSet, given: &VertexSet) -> Self::Output;
    fn visit_kernel(&mut self, kernel: &Kernel) -> Self::Output;
    fn visit_sum(&mut self, over: &VertexSet, body: &Functional) -> Self::Output;
    fn visit_add(&mut self, terms: &[Functional]) -> Self::Output;
    fn visit_product(&mut self, factors: &[Functional]) -> Self::Output;
    fn visit_ratio(&mut self, numerator: &Functional, denominator: &Functional) -> Self::Output;
    fn visit_difference(&mut self, left: &Functional, right: &Functional) -> Self::Output;
    fn visit_indicator(&mut self, vertex: &str, value: f64) -> Self::Output;
    fn visit_point_mass(&mut self, vertices: &VertexSet) -> Self::Output;
    fn visit_value(&mut self, vertex: &str) -> Self::Output;
    fn visit_bind(&mut self, vertex: &str, value: f64, body: &Functional) -> Self::Output;
    fn visit_constant(&mut self, value: f64) -> Self::Output;
}

impl Functional {
    /// Dispatch to the matching visitor callback.
    pub fn accept<V: FunctionalVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Functional::Prob { vars, given } => visitor.visit_prob(vars, given),
            Functional::Kernel(kernel) => visitor.visit_kernel(kernel),
            Functional::Sum { over, body } => visitor.visit_sum(over, body),
            Functional::Add(terms) => visitor.visit_add(terms),
            Functional::Product(factors) => visitor.visit_product(factors),
            Functional::Ratio {
                numerator,
                denominator,
            } => visitor.visit_ratio(numerator, denominator),
            Functional::Difference { left, right } => visitor.visit_difference(left, right),
            Functional::Indicator { vertex, value } => visitor.visit_indicator(vertex, *value),
            Functional::PointMass { vertices } => visitor.visit_point_mass(vertices),
            Functional::Value(vertex) => visitor.visit_value(vertex),
            Functional::Bind {
                vertex,
                value,
                body,
            } => visitor.visit_bind(vertex, *value, body),
            Functional::Constant(value) => visitor.visit_constant(*value),
        }
    }
}
