//! Influence functions of identified counterfactual means, derived
//! symbolically as the Gateaux derivative of the identifying functional.
//!
//! The derivative is taken over the functional's expression tree:
//!
//! ```text
//! d p(a)       = δ(a) - p(a)
//! d p(a | c)   = [δ(a, c) - δ(c) p(a | c)] / p(c)
//! d (f g)      = d f g + f d g
//! d (f / g)    = (d f g - f d g) / (g g)
//! ```
//!
//! Sums, additions, differences and bindings are linear; constants,
//! indicators, point masses and bound values have derivative zero.

use std::collections::BTreeMap;

use tracing::{debug, info};

use causa_core::errors::{EstimationError, GraphError};
use causa_graphs::{Graph, VertexSet};
use causa_identification::{expand_kernels, Functional, FunctionalVisitor, Kernel, OneLineId};

use crate::dataset::Dataset;
use crate::evaluate::PlugInEvaluator;

/// Influence function of `E[Y(a)]` for a treatment that is childless in
/// its district.
#[derive(Debug, Clone)]
pub struct AutomatedIf {
    graph: Graph,
    treatment: String,
    outcome: String,
    one_line: OneLineId,
    order: Vec<String>,
    pretreatment: VertexSet,
    district_post: VertexSet,
    mediators: VertexSet,
}

impl AutomatedIf {
    /// Works on the ancestral subgraph of the outcome.
    pub fn new(graph: &Graph, treatment: &str, outcome: &str) -> Result<Self, EstimationError> {
        for vertex in [treatment, outcome] {
            if !graph.contains(vertex) {
                return Err(GraphError::UnknownVertex {
                    name: vertex.to_string(),
                }
                .into());
            }
        }
        let ancestors = graph.ancestors([outcome]);
        if !ancestors.contains(treatment) {
            return Err(EstimationError::UnsupportedFunctional {
                reason: format!("{treatment} is not an ancestor of {outcome}"),
            });
        }
        let graph = graph.subgraph(&ancestors);

        let district = graph.district(treatment);
        if !district.is_disjoint(&graph.children([treatment])) {
            return Err(EstimationError::UnsupportedFunctional {
                reason: format!("{treatment} has a child in its district"),
            });
        }

        let order = late_treatment_order(&graph, treatment)?;
        let pretreatment = graph.pre([treatment], &order);
        let district_post: VertexSet = district
            .iter()
            .filter(|v| *v != treatment && !pretreatment.contains(*v))
            .cloned()
            .collect();
        let mediators: VertexSet = graph
            .vertex_names()
            .into_iter()
            .filter(|v| !pretreatment.contains(v) && !district.contains(v))
            .collect();

        let mut one_line = OneLineId::new(&graph, [treatment], [outcome])?;
        one_line.id()?;

        debug!(
            order = ?order,
            pretreatment = ?pretreatment,
            district_post = ?district_post,
            mediators = ?mediators,
            "partitioned vertices"
        );
        Ok(Self {
            graph,
            treatment: treatment.to_string(),
            outcome: outcome.to_string(),
            one_line,
            order,
            pretreatment,
            district_post,
            mediators,
        })
    }

    /// The ancestral subgraph of the outcome.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Topological order with the treatment as late as possible.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// `C`: vertices before the treatment.
    pub fn pretreatment(&self) -> &VertexSet {
        &self.pretreatment
    }

    /// `L`: the treatment's district after it, without the treatment.
    pub fn district_post(&self) -> &VertexSet {
        &self.district_post
    }

    /// `M`: everything else.
    pub fn mediators(&self) -> &VertexSet {
        &self.mediators
    }

    /// Identifying functional of `E[Y(a)]`.
    pub fn functional(&self, assignment: f64) -> Result<Functional, EstimationError> {
        Ok(self.one_line.mean_functional(
            &self.outcome,
            &BTreeMap::from([(self.treatment.clone(), assignment)]),
        )?)
    }

    /// Gateaux derivative of `functional`, simplified.
    pub fn compute_if(&self, functional: &Functional) -> Result<Functional, EstimationError> {
        let expanded = expand_kernels(functional)?;
        let derivative = expanded.accept(&mut GateauxDerivative)?.simplify();
        info!(treatment = %self.treatment, outcome = %self.outcome, "influence function derived");
        Ok(derivative)
    }

    pub fn influence_function(&self, assignment: f64) -> Result<Functional, EstimationError> {
        self.compute_if(&self.functional(assignment)?)
    }

    /// Value of `influence` at every row of `data`.
    pub fn evaluate(&self, data: &Dataset, influence: &Functional) -> Result<Vec<f64>, EstimationError> {
        let mut evaluator = PlugInEvaluator::new(data);
        (0..data.n_rows())
            .map(|row| {
                evaluator.set_observation(Some(row));
                evaluator.evaluate(influence)
            })
            .collect()
    }

    /// `sqrt(var(IF) / n)` of influence function values.
    pub fn standard_error(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (variance / n).sqrt()
    }
}

/// Topological order of `graph` with `treatment` moved past every
/// following vertex that is not one of its children.
fn late_treatment_order(graph: &Graph, treatment: &str) -> Result<Vec<String>, GraphError> {
    let mut order = graph.topological_sort()?;
    let children = graph.children([treatment]);
    let Some(mut position) = order.iter().position(|v| v == treatment) else {
        return Ok(order);
    };
    while position + 1 < order.len() && !children.contains(&order[position + 1]) {
        order.swap(position, position + 1);
        position += 1;
    }
    Ok(order)
}

struct GateauxDerivative;

impl FunctionalVisitor for GateauxDerivative {
    type Output = Result<Functional, EstimationError>;

    fn visit_prob(&mut self, vars: &VertexSet, given: &VertexSet) -> Self::Output {
        if given.is_empty() {
            return Ok(Functional::difference(
                Functional::point_mass(vars),
                Functional::prob(vars, VertexSet::new()),
            ));
        }
        Ok(Functional::ratio(
            Functional::difference(
                Functional::point_mass(vars.union(given)),
                Functional::product([Functional::point_mass(given), Functional::prob(vars, given)]),
            ),
            Functional::prob(given, VertexSet::new()),
        ))
    }

    fn visit_kernel(&mut self, _kernel: &Kernel) -> Self::Output {
        Err(EstimationError::UnsupportedFunctional {
            reason: "fixing kernels must be expanded before differentiation".into(),
        })
    }

    fn visit_sum(&mut self, over: &VertexSet, body: &Functional) -> Self::Output {
        Ok(Functional::sum(over, body.accept(self)?))
    }

    fn visit_add(&mut self, terms: &[Functional]) -> Self::Output {
        let derivatives = terms
            .iter()
            .map(|t| t.accept(self))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Functional::add(derivatives))
    }

    fn visit_product(&mut self, factors: &[Functional]) -> Self::Output {
        let mut terms = Vec::with_capacity(factors.len());
        for (i, factor) in factors.iter().enumerate() {
            let derivative = factor.accept(self)?;
            if derivative.is_zero() {
                continue;
            }
            let mut term = factors.to_vec();
            term[i] = derivative;
            terms.push(Functional::product(term));
        }
        Ok(Functional::add(terms))
    }

    fn visit_ratio(&mut self, numerator: &Functional, denominator: &Functional) -> Self::Output {
        let d_numerator = numerator.accept(self)?;
        let d_denominator = denominator.accept(self)?;
        Ok(Functional::ratio(
            Functional::difference(
                Functional::product([d_numerator, denominator.clone()]),
                Functional::product([numerator.clone(), d_denominator]),
            ),
            Functional::product([denominator.clone(), denominator.clone()]),
        ))
    }

    fn visit_difference(&mut self, left: &Functional, right: &Functional) -> Self::Output {
        Ok(Functional::difference(left.accept(self)?, right.accept(self)?))
    }

    fn visit_indicator(&mut self, _vertex: &str, _value: f64) -> Self::Output {
        Ok(Functional::Constant(0.0))
    }

    fn visit_point_mass(&mut self, _vertices: &VertexSet) -> Self::Output {
        Ok(Functional::Constant(0.0))
    }

    fn visit_value(&mut self, _vertex: &str) -> Self::Output {
        Ok(Functional::Constant(0.0))
    }

    fn visit_bind(&mut self, vertex: &str, value: f64, body: &Functional) -> Self::Output {
        Ok(Functional::bind(vertex, value, body.accept(self)?))
    }

    fn visit_constant(&mut self, _value: f64) -> Self::Output {
        Ok(Functional::Constant(0.0))
    }
}
