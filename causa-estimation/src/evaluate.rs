//! Plug-in evaluation of functionals against the empirical distribution.
//!
//! `p(vars | given)` is the stratified frequency of the bound values of
//! `vars` among the rows matching the bound values of `given`. Sums range
//! over the observed domain of every summed vertex. Empty strata give zero,
//! and so does any ratio with a zero denominator.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use causa_core::constants::PROBABILITY_FLOOR;
use causa_core::errors::EstimationError;
use causa_graphs::VertexSet;
use causa_identification::{expand_kernels, Functional, FunctionalVisitor, Kernel};

use crate::dataset::Dataset;

/// Upper bound on the joint configurations a single sum may enumerate.
pub const MAX_SUM_CONFIGURATIONS: usize = 1 << 22;

type Assignment = Vec<(String, u64)>;

fn matches(row: usize, columns: &[(&[f64], f64)]) -> bool {
    columns.iter().all(|(column, value)| column[row] == *value)
}

/// Evaluates a [`Functional`] on a [`Dataset`].
///
/// Probabilities are cached across calls, so one evaluator can be reused to
/// evaluate the same functional at every observation.
pub struct PlugInEvaluator<'a> {
    data: &'a Dataset,
    bindings: BTreeMap<String, f64>,
    observation: Option<usize>,
    cache: HashMap<(Assignment, Assignment), f64>,
}

impl<'a> PlugInEvaluator<'a> {
    pub fn new(data: &'a Dataset) -> Self {
        Self {
            data,
            bindings: BTreeMap::new(),
            observation: None,
            cache: HashMap::new(),
        }
    }

    /// Bind a free vertex for every subsequent evaluation.
    pub fn with_binding(mut self, vertex: impl Into<String>, value: f64) -> Self {
        self.bindings.insert(vertex.into(), value);
        self
    }

    /// Row that point masses compare against.
    pub fn set_observation(&mut self, row: Option<usize>) {
        self.observation = row;
    }

    /// Evaluate `functional`, expanding any fixing kernel first.
    pub fn evaluate(&mut self, functional: &Functional) -> Result<f64, EstimationError> {
        if functional.has_kernels() {
            let expanded = expand_kernels(functional).map_err(|e| {
                EstimationError::UnsupportedFunctional {
                    reason: e.to_string(),
                }
            })?;
            return expanded.accept(self);
        }
        functional.accept(self)
    }

    fn bound(&self, vertex: &str) -> Result<f64, EstimationError> {
        self.bindings
            .get(vertex)
            .copied()
            .ok_or_else(|| EstimationError::UnboundVertex {
                name: vertex.to_string(),
            })
    }

    fn assignment(&self, vertices: &VertexSet) -> Result<Assignment, EstimationError> {
        vertices
            .iter()
            .map(|v| Ok((v.clone(), self.bound(v)?.to_bits())))
            .collect()
    }

    fn matcher(&self, assignment: &Assignment) -> Result<Vec<(&'a [f64], f64)>, EstimationError> {
        let data = self.data;
        assignment
            .iter()
            .map(|(v, bits)| Ok((data.column(v)?, f64::from_bits(*bits))))
            .collect()
    }

    fn frequency(&mut self, vars: &VertexSet, given: &VertexSet) -> Result<f64, EstimationError> {
        let key = (self.assignment(vars)?, self.assignment(given)?);
        if let Some(&p) = self.cache.get(&key) {
            return Ok(p);
        }
        let joint = self.matcher(&key.0)?;
        let condition = self.matcher(&key.1)?;
        let (mut hits, mut stratum) = (0usize, 0usize);
        for row in 0..self.data.n_rows() {
            if matches(row, &condition) {
                stratum += 1;
                if matches(row, &joint) {
                    hits += 1;
                }
            }
        }
        let p = if stratum == 0 {
            0.0
        } else {
            hits as f64 / stratum as f64
        };
        self.cache.insert(key, p);
        Ok(p)
    }

    /// Evaluate `f` with `assignment` bound, restoring earlier bindings.
    fn scoped<T>(&mut self, assignment: &[(String, f64)], f: impl FnOnce(&mut Self) -> T) -> T {
        let saved: Vec<(String, Option<f64>)> = assignment
            .iter()
            .map(|(v, value)| (v.clone(), self.bindings.insert(v.clone(), *value)))
            .collect();
        let result = f(self);
        for (v, previous) in saved {
            match previous {
                Some(value) => self.bindings.insert(v, value),
                None => self.bindings.remove(&v),
            };
        }
        result
    }
}

impl FunctionalVisitor for PlugInEvaluator<'_> {
    type Output = Result<f64, EstimationError>;

    fn visit_prob(&mut self, vars: &VertexSet, given: &VertexSet) -> Self::Output {
        self.frequency(vars, given)
    }

    fn visit_kernel(&mut self, kernel: &Kernel) -> Self::Output {
        self.evaluate(&Functional::Kernel(kernel.clone()))
    }

    fn visit_sum(&mut self, over: &VertexSet, body: &Functional) -> Self::Output {
        let domains = over
            .iter()
            .map(|v| Ok((v.clone(), self.data.domain(v)?)))
            .collect::<Result<Vec<_>, EstimationError>>()?;
        let configurations = domains
            .iter()
            .try_fold(1usize, |acc, (_, d)| acc.checked_mul(d.len()))
            .filter(|&c| c <= MAX_SUM_CONFIGURATIONS)
            .ok_or_else(|| EstimationError::UnsupportedFunctional {
                reason: format!("sum over {over:?} has too many configurations"),
            })?;
        trace!(over = ?over, configurations, "enumerating sum");

        let mut index = vec![0usize; domains.len()];
        let mut total = 0.0;
        for _ in 0..configurations {
            let assignment: Vec<(String, f64)> = domains
                .iter()
                .zip(&index)
                .map(|((v, domain), &i)| (v.clone(), domain[i]))
                .collect();
            total += self.scoped(&assignment, |ev| body.accept(ev))?;

            for (k, (_, domain)) in domains.iter().enumerate() {
                index[k] += 1;
                if index[k] < domain.len() {
                    break;
                }
                index[k] = 0;
            }
        }
        Ok(total)
    }

    fn visit_add(&mut self, terms: &[Functional]) -> Self::Output {
        terms.iter().map(|t| t.accept(self)).sum()
    }

    fn visit_product(&mut self, factors: &[Functional]) -> Self::Output {
        let mut product = 1.0;
        for factor in factors {
            product *= factor.accept(self)?;
            if product == 0.0 {
                break;
            }
        }
        Ok(product)
    }

    fn visit_ratio(&mut self, numerator: &Functional, denominator: &Functional) -> Self::Output {
        let numerator = numerator.accept(self)?;
        if numerator == 0.0 {
            return Ok(0.0);
        }
        let denominator = denominator.accept(self)?;
        if denominator.abs() < PROBABILITY_FLOOR {
            return Ok(0.0);
        }
        Ok(numerator / denominator)
    }

    fn visit_difference(&mut self, left: &Functional, right: &Functional) -> Self::Output {
        Ok(left.accept(self)? - right.accept(self)?)
    }

    fn visit_indicator(&mut self, vertex: &str, value: f64) -> Self::Output {
        Ok(if self.bound(vertex)? == value { 1.0 } else { 0.0 })
    }

    fn visit_point_mass(&mut self, vertices: &VertexSet) -> Self::Output {
        let row = self
            .observation
            .ok_or_else(|| EstimationError::UnsupportedFunctional {
                reason: "a point mass needs an observation to compare against".into(),
            })?;
        for v in vertices {
            if self.data.column(v)?[row] != self.bound(v)? {
                return Ok(0.0);
            }
        }
        Ok(1.0)
    }

    fn visit_value(&mut self, vertex: &str) -> Self::Output {
        self.bound(vertex)
    }

    fn visit_bind(&mut self, vertex: &str, value: f64, body: &Functional) -> Self::Output {
        self.scoped(&[(vertex.to_string(), value)], |ev| body.accept(ev))
    }

    fn visit_constant(&mut self, value: f64) -> Self::Output {
        Ok(value)
    }
}
