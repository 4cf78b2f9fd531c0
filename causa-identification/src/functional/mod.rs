//! Symbolic identifying functionals.
//!
//! A [`Functional`] is an immutable expression tree over the observed-data
//! distribution. Free vertex names are bound by an enclosing [`Functional::Sum`]
//! or [`Functional::Bind`], or by whoever evaluates the tree. Every consumer
//! (display, plug-in evaluation, differentiation) walks the tree through
//! [`FunctionalVisitor`].

mod display;
mod expand;
mod visitor;

use std::fmt;
use std::sync::Arc;

use causa_graphs::{Graph, VertexSet};

pub use expand::expand_kernels;
pub use visitor::FunctionalVisitor;

/// A fixing kernel `q_D(D | pa)` obtained from `p(V)` (or from the
/// experimental distribution `p(V | do(E))`) by fixing `fixing_order` in
/// `graph`.
#[derive(Debug, Clone)]
pub struct Kernel {
    pub district: VertexSet,
    pub fixing_order: Vec<String>,
    /// Vertices intervened on in the source distribution. Empty for the
    /// observational law.
    pub experiment: VertexSet,
    pub graph: Arc<Graph>,
}

impl PartialEq for Kernel {
    fn eq(&self, other: &Self) -> bool {
        self.district == other.district
            && self.fixing_order == other.fixing_order
            && self.experiment == other.experiment
    }
}

/// Expression tree of an identifying functional.
#[derive(Debug, Clone, PartialEq)]
pub enum Functional {
    /// `p(vars | given)` under the observed-data law.
    Prob { vars: VertexSet, given: VertexSet },
    Kernel(Kernel),
    /// Sum over the observed domain of every vertex in `over`.
    Sum { over: VertexSet, body: Box<Functional> },
    Add(Vec<Functional>),
    Product(Vec<Functional>),
    Ratio {
        numerator: Box<Functional>,
        denominator: Box<Functional>,
    },
    Difference {
        left: Box<Functional>,
        right: Box<Functional>,
    },
    /// `I(vertex = value)`.
    Indicator { vertex: String, value: f64 },
    /// `δ(vertices)`: one when the bound values of `vertices` equal those of
    /// the observation the functional is evaluated at, zero otherwise.
    PointMass { vertices: VertexSet },
    /// The bound value of a vertex.
    Value(String),
    /// Evaluate `body` with `vertex` bound to `value`.
    Bind {
        vertex: String,
        value: f64,
        body: Box<Functional>,
    },
    Constant(f64),
}

impl Functional {
    pub fn prob<I, J, S, T>(vars: I, given: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let vars: VertexSet = vars.into_iter().map(|v| v.as_ref().to_string()).collect();
        let given = given
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .filter(|v| !vars.contains(v))
            .collect();
        Functional::Prob { vars, given }
    }

    /// `Σ_over body`; an empty `over` returns `body` itself.
    pub fn sum<S: AsRef<str>>(over: impl IntoIterator<Item = S>, body: Functional) -> Self {
        let over: VertexSet = over.into_iter().map(|v| v.as_ref().to_string()).collect();
        if over.is_empty() {
            return body;
        }
        Functional::Sum {
            over,
            body: Box::new(body),
        }
    }

    /// Product of `factors`, flattening nested products. A single factor is
    /// returned unchanged and no factors give the constant one.
    pub fn product(factors: impl IntoIterator<Item = Functional>) -> Self {
        let mut flat = Vec::new();
        for factor in factors {
            match factor {
                Functional::Product(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Functional::Constant(1.0),
            1 => flat.remove(0),
            _ => Functional::Product(flat),
        }
    }

    pub fn add(terms: impl IntoIterator<Item = Functional>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Functional::Add(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Functional::Constant(0.0),
            1 => flat.remove(0),
            _ => Functional::Add(flat),
        }
    }

    pub fn ratio(numerator: Functional, denominator: Functional) -> Self {
        Functional::Ratio {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }

    pub fn difference(left: Functional, right: Functional) -> Self {
        Functional::Difference {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn bind(vertex: impl Into<String>, value: f64, body: Functional) -> Self {
        Functional::Bind {
            vertex: vertex.into(),
            value,
            body: Box::new(body),
        }
    }

    pub fn point_mass<S: AsRef<str>>(vertices: impl IntoIterator<Item = S>) -> Self {
        Functional::PointMass {
            vertices: vertices.into_iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Functional::Constant(c) if *c == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Functional::Constant(c) if *c == 1.0)
    }

    /// Whether a fixing kernel occurs anywhere in the tree.
    pub fn has_kernels(&self) -> bool {
        match self {
            Functional::Kernel(_) => true,
            Functional::Sum { body, .. } | Functional::Bind { body, .. } => body.has_kernels(),
            Functional::Add(items) | Functional::Product(items) => {
                items.iter().any(Functional::has_kernels)
            }
            Functional::Ratio {
                numerator,
                denominator,
            } => numerator.has_kernels() || denominator.has_kernels(),
            Functional::Difference { left, right } => left.has_kernels() || right.has_kernels(),
            _ => false,
        }
    }

    /// Prune zeros and ones bottom-up, and rewrite marginals and ratios of
    /// observed probabilities into single conditionals where possible.
    pub fn simplify(self) -> Functional {
        match self {
            Functional::Sum { over, body } => {
                let body = body.simplify();
                if body.is_zero() {
                    return body;
                }
                match body {
                    Functional::Prob { vars, given } if given.is_empty() && over.is_subset(&vars) => {
                        let vars: VertexSet = vars.difference(&over).cloned().collect();
                        if vars.is_empty() {
                            Functional::Constant(1.0)
                        } else {
                            Functional::Prob { vars, given }
                        }
                    }
                    body => Functional::sum(over, body),
                }
            }
            Functional::Product(factors) => {
                let factors: Vec<Functional> = factors
                    .into_iter()
                    .map(Functional::simplify)
                    .filter(|f| !f.is_one())
                    .collect();
                if factors.iter().any(Functional::is_zero) {
                    return Functional::Constant(0.0);
                }
                Functional::product(factors)
            }
            Functional::Add(terms) => Functional::add(
                terms
                    .into_iter()
                    .map(Functional::simplify)
                    .filter(|t| !t.is_zero()),
            ),
            Functional::Ratio {
                numerator,
                denominator,
            } => {
                let numerator = numerator.simplify();
                let denominator = denominator.simplify();
                if numerator.is_zero() {
                    return numerator;
                }
                if denominator.is_one() {
                    return numerator;
                }
                match (numerator, denominator) {
                    (
                        Functional::Prob { vars: joint, given: g1 },
                        Functional::Prob { vars: marginal, given: g2 },
                    ) if g1.is_empty() && g2.is_empty() && marginal.is_subset(&joint) => {
                        let vars: VertexSet = joint.difference(&marginal).cloned().collect();
                        if vars.is_empty() {
                            Functional::Constant(1.0)
                        } else {
                            Functional::Prob {
                                vars,
                                given: marginal,
                            }
                        }
                    }
                    (numerator, denominator) => Functional::ratio(numerator, denominator),
                }
            }
            Functional::Difference { left, right } => {
                let left = left.simplify();
                let right = right.simplify();
                match (left.is_zero(), right.is_zero()) {
                    (_, true) => left,
                    (true, false) => {
                        Functional::product([Functional::Constant(-1.0), right])
                    }
                    _ => Functional::difference(left, right),
                }
            }
            Functional::Bind {
                vertex,
                value,
                body,
            } => {
                let body = body.simplify();
                match body {
                    Functional::Constant(_) => body,
                    body => Functional::bind(vertex, value, body),
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for Functional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.accept(&mut display::DisplayVisitor))
    }
}
