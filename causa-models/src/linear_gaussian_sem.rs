//! Linear Gaussian structural equation models on ADMGs.
//!
//! Every vertex is a linear function of its parents plus an error term;
//! errors are correlated exactly along bidirected edges:
//!
//! ```text
//! X = B X + ε,   ε ~ N(0, Ω),   Σ = (I - B)^{-1} Ω (I - B)^{-T}
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use causa_core::config::SemConfig;
use causa_core::errors::ModelError;
use causa_core::fit_span;
use causa_estimation::Dataset;
use causa_graphs::{Graph, VertexSet};

use crate::ricf::{self, Parameters, Structure};

/// Stopping rule of the RICF iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Largest change of the negative log-likelihood accepted as converged.
    pub tolerance: f64,
    /// Keep the last parameters, flagged unconverged, instead of failing
    /// when `max_iterations` runs out.
    pub accept_unconverged: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self::from(&SemConfig::default())
    }
}

impl From<&SemConfig> for FitOptions {
    fn from(config: &SemConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            accept_unconverged: config.accept_unconverged,
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    params: Parameters,
    implied: DMatrix<f64>,
    iterations: usize,
    converged: bool,
}

/// A linear Gaussian SEM over the vertices of an ADMG.
#[derive(Debug, Clone)]
pub struct LinearGaussianSem {
    graph: Arc<Graph>,
    /// Vertices in topological order; matrix rows and columns follow it.
    vertices: Vec<String>,
    index: BTreeMap<String, usize>,
    structure: Structure,
    fitted: Option<Fitted>,
}

impl LinearGaussianSem {
    /// Fails on graphs with undirected edges or directed cycles.
    pub fn new(graph: &Graph) -> Result<Self, ModelError> {
        if !graph.ud_edges().is_empty() {
            return Err(ModelError::UnsupportedGraph {
                reason: "linear Gaussian SEMs need a graph without undirected edges".into(),
            });
        }
        let vertices = graph.topological_sort().map_err(|e| ModelError::UnsupportedGraph {
            reason: e.to_string(),
        })?;
        let index: BTreeMap<String, usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();
        let positions = |names: VertexSet| -> Vec<usize> {
            names.iter().filter_map(|n| index.get(n).copied()).collect()
        };
        let structure = Structure {
            parents: vertices.iter().map(|v| positions(graph.parents([v]))).collect(),
            spouses: vertices.iter().map(|v| positions(graph.siblings([v]))).collect(),
        };

        Ok(Self {
            graph: Arc::new(graph.clone()),
            vertices,
            index,
            structure,
            fitted: None,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Row and column labels of every matrix this model returns.
    pub fn vertices(&self) -> &[String] {
        &self.vertices
    }

    /// One variance per vertex, one coefficient per directed edge and one
    /// covariance per bidirected edge.
    pub fn n_params(&self) -> usize {
        self.vertices.len() + self.graph.di_edges().len() + self.graph.bi_edges().len()
    }

    /// Fit with the default stopping rule.
    pub fn fit(&mut self, data: &Dataset) -> Result<(), ModelError> {
        self.fit_with(data, &FitOptions::default())
    }

    /// Fit by RICF. Running out of iterations is an error unless
    /// `options.accept_unconverged` is set; an earlier fit is discarded
    /// either way.
    pub fn fit_with(&mut self, data: &Dataset, options: &FitOptions) -> Result<(), ModelError> {
        let _span = fit_span!("linear_gaussian_sem", data.n_rows()).entered();
        self.fitted = None;

        let (centered, sample) = self.sample_covariance(data)?;
        let n = data.n_rows();
        let mut params = Parameters::initial(&sample);
        let mut previous = ricf::neg_log_likelihood(&params.implied_covariance()?, &sample, n)?;
        let mut last_delta = f64::INFINITY;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < options.max_iterations {
            iterations += 1;
            ricf::sweep(&centered, &self.structure, &mut params)?;
            let current = ricf::neg_log_likelihood(&params.implied_covariance()?, &sample, n)?;
            last_delta = (previous - current).abs();
            debug!(iteration = iterations, nll = current, delta = last_delta, "RICF sweep");
            previous = current;
            if last_delta < options.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            if !options.accept_unconverged {
                return Err(ModelError::Convergence {
                    iterations,
                    tolerance: options.tolerance,
                    last_delta,
                });
            }
            warn!(iterations, last_delta, "keeping unconverged RICF estimates");
        } else {
            info!(iterations, nll = previous, "RICF converged");
        }

        let implied = params.implied_covariance()?;
        self.fitted = Some(Fitted {
            params,
            implied,
            iterations,
            converged,
        });
        Ok(())
    }

    fn fitted(&self, operation: &'static str) -> Result<&Fitted, ModelError> {
        self.fitted.as_ref().ok_or(ModelError::State {
            operation,
            requires: "fit",
        })
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Whether the last fit met the tolerance.
    pub fn converged(&self) -> Result<bool, ModelError> {
        Ok(self.fitted("converged")?.converged)
    }

    pub fn iterations(&self) -> Result<usize, ModelError> {
        Ok(self.fitted("iterations")?.iterations)
    }

    /// `B`, with `B[(i, j)]` the coefficient of `vertices()[j]` in the
    /// equation of `vertices()[i]`.
    pub fn coefficients(&self) -> Result<&DMatrix<f64>, ModelError> {
        Ok(&self.fitted("coefficients")?.params.b)
    }

    /// Coefficient of the directed edge `from -> to`; zero without one.
    pub fn coefficient(&self, from: &str, to: &str) -> Result<f64, ModelError> {
        let b = &self.fitted("coefficient")?.params.b;
        Ok(b[(self.position(to)?, self.position(from)?)])
    }

    /// Error covariance `Ω`.
    pub fn covariance(&self) -> Result<&DMatrix<f64>, ModelError> {
        Ok(&self.fitted("covariance")?.params.omega)
    }

    /// Entry of `Ω` for a pair of vertices; zero unless they are equal or
    /// joined by a bidirected edge.
    pub fn error_covariance(&self, a: &str, b: &str) -> Result<f64, ModelError> {
        let omega = &self.fitted("error_covariance")?.params.omega;
        Ok(omega[(self.position(a)?, self.position(b)?)])
    }

    /// `Σ = (I - B)^{-1} Ω (I - B)^{-T}`.
    pub fn implied_covariance(&self) -> Result<&DMatrix<f64>, ModelError> {
        Ok(&self.fitted("implied_covariance")?.implied)
    }

    /// Negative log-likelihood of `data` under the fitted covariance.
    pub fn neg_log_likelihood(&self, data: &Dataset) -> Result<f64, ModelError> {
        let implied = &self.fitted("neg_log_likelihood")?.implied;
        let (_, sample) = self.sample_covariance(data)?;
        ricf::neg_log_likelihood(implied, &sample, data.n_rows())
    }

    /// `2 nll + n_params ln(n)`.
    pub fn bic(&self, data: &Dataset) -> Result<f64, ModelError> {
        let nll = self.neg_log_likelihood(data)?;
        Ok(2.0 * nll + self.n_params() as f64 * (data.n_rows() as f64).ln())
    }

    /// Sum over every directed path from `source` to `target` of the
    /// product of its edge coefficients.
    pub fn total_effect(&self, source: &str, target: &str) -> Result<f64, ModelError> {
        let b = &self.fitted("total_effect")?.params.b;
        self.position(source)?;
        self.position(target)?;
        let mut total = 0.0;
        for path in self.graph.directed_paths([source], [target]) {
            let mut product = 1.0;
            for edge in path.windows(2) {
                product *= b[(self.position(&edge[1])?, self.position(&edge[0])?)];
            }
            total += product;
        }
        Ok(total)
    }

    fn position(&self, vertex: &str) -> Result<usize, ModelError> {
        self.index.get(vertex).copied().ok_or_else(|| ModelError::InvalidData {
            reason: format!("{vertex} is not a vertex of the model"),
        })
    }

    /// Column-centered data in vertex order and its covariance (divided by `n`).
    fn sample_covariance(&self, data: &Dataset) -> Result<(DMatrix<f64>, DMatrix<f64>), ModelError> {
        let columns = self
            .vertices
            .iter()
            .map(|v| data.column(v))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ModelError::InvalidData { reason: e.to_string() })?;
        let n = data.n_rows();
        let means: Vec<f64> = columns.iter().map(|c| c.iter().sum::<f64>() / n as f64).collect();
        let centered = DMatrix::from_fn(n, columns.len(), |r, c| columns[c][r] - means[c]);
        let sample = centered.transpose() * &centered / n as f64;
        Ok((centered, sample))
    }
}
