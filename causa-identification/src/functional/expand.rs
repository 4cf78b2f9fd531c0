//! Kernel expansion.
//!
//! Fixing `v` in a kernel `q(R | W)` divides by the conditional of `v`
//! given its Markov blanket in the current CADMG:
//!
//! `q(R \ v | W ∪ v) = q(R | W) / q(v | mb(v))`, where
//! `q(v | mb(v)) = Σ_{R \ (mb ∪ v)} q / Σ_{R \ mb} q`.
//!
//! Applying this along the fixing order rewrites a kernel into sums and
//! ratios of observed-data probabilities.

use causa_core::errors::{format_vertex_set, IdentificationError};
use causa_graphs::VertexSet;
use tracing::debug;

use super::{Functional, FunctionalVisitor, Kernel};

/// Replace every observational kernel in `functional` by its expansion.
///
/// Kernels over an experimental distribution cannot be written in terms of
/// `p(V)` and are rejected.
pub fn expand_kernels(functional: &Functional) -> Result<Functional, IdentificationError> {
    functional.accept(&mut KernelExpander)
}

struct KernelExpander;

impl KernelExpander {
    fn boxed(&mut self, f: &Functional) -> Result<Box<Functional>, IdentificationError> {
        f.accept(self).map(Box::new)
    }

    fn all(&mut self, items: &[Functional]) -> Result<Vec<Functional>, IdentificationError> {
        items.iter().map(|f| f.accept(self)).collect()
    }
}

fn expand_kernel(kernel: &Kernel) -> Result<Functional, IdentificationError> {
    if !kernel.experiment.is_empty() {
        return Err(IdentificationError::InvalidQuery {
            reason: format!(
                "kernel of {} is taken from p(V | do({})) and has no observational expansion",
                format_vertex_set(&kernel.district),
                format_vertex_set(&kernel.experiment)
            ),
        });
    }
    let mut cadmg = (*kernel.graph).clone();
    let mut q = Functional::prob(cadmg.random_vertices(), VertexSet::new());
    for v in &kernel.fixing_order {
        let blanket = cadmg.markov_blanket([v]);
        let random = cadmg.random_vertices();
        let mut family = blanket.clone();
        family.insert(v.clone());
        let numerator = Functional::sum(random.difference(&family), q.clone());
        let denominator = Functional::sum(random.difference(&blanket), q.clone());
        let conditional = Functional::ratio(numerator, denominator).simplify();
        debug!(vertex = %v, conditional = %conditional, "expanding fixing step");
        q = Functional::ratio(q, conditional).simplify();
        cadmg.fix([v])?;
    }
    Ok(q)
}

impl FunctionalVisitor for KernelExpander {
    type Output = Result<Functional, IdentificationError>;

    fn visit_prob(&mut self, vars: &VertexSet, given: &VertexSet) -> Self::Output {
        Ok(Functional::Prob {
            vars: vars.clone(),
            given: given.clone(),
        })
    }

    fn visit_kernel(&mut self, kernel: &Kernel) -> Self::Output {
        expand_kernel(kernel)
    }

    fn visit_sum(&mut self, over: &VertexSet, body: &Functional) -> Self::Output {
        Ok(Functional::Sum {
            over: over.clone(),
            body: self.boxed(body)?,
        })
    }

    fn visit_add(&mut self, terms: &[Functional]) -> Self::Output {
        Ok(Functional::Add(self.all(terms)?))
    }

    fn visit_product(&mut self, factors: &[Functional]) -> Self::Output {
        Ok(Functional::Product(self.all(factors)?))
    }

    fn visit_ratio(&mut self, numerator: &Functional, denominator: &Functional) -> Self::Output {
        Ok(Functional::Ratio {
            numerator: self.boxed(numerator)?,
            denominator: self.boxed(denominator)?,
        })
    }

    fn visit_difference(&mut self, left: &Functional, right: &Functional) -> Self::Output {
        Ok(Functional::Difference {
            left: self.boxed(left)?,
            right: self.boxed(right)?,
        })
    }

    fn visit_indicator(&mut self, vertex: &str, value: f64) -> Self::Output {
        Ok(Functional::Indicator {
            vertex: vertex.to_string(),
            value,
        })
    }

    fn visit_point_mass(&mut self, vertices: &VertexSet) -> Self::Output {
        Ok(Functional::PointMass {
            vertices: vertices.clone(),
        })
    }

    fn visit_value(&mut self, vertex: &str) -> Self::Output {
        Ok(Functional::Value(vertex.to_string()))
    }

    fn visit_bind(&mut self, vertex: &str, value: f64, body: &Functional) -> Self::Output {
        Ok(Functional::Bind {
            vertex: vertex.to_string(),
            value,
            body: self.boxed(body)?,
        })
    }

    fn visit_constant(&mut self, value: f64) -> Self::Output {
        Ok(Functional::Constant(value))
    }
}
