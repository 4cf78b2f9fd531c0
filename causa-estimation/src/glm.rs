//! Generalized linear models with an intercept: Gaussian with identity link
//! (least squares) and binomial with logit link (IRLS).

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use causa_core::config::{defaults, EstimationConfig};
use causa_core::constants::PROBABILITY_FLOOR;
use causa_core::errors::EstimationError;

use crate::dataset::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Gaussian,
    Binomial,
}

/// IRLS stopping rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlmOptions {
    pub max_iterations: usize,
    /// Largest absolute coefficient change accepted as converged.
    pub tolerance: f64,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            max_iterations: defaults::DEFAULT_GLM_MAX_ITERATIONS,
            tolerance: defaults::DEFAULT_GLM_TOLERANCE,
        }
    }
}

impl From<&EstimationConfig> for GlmOptions {
    fn from(config: &EstimationConfig) -> Self {
        Self {
            max_iterations: config.glm_max_iterations,
            tolerance: config.glm_tolerance,
        }
    }
}

pub fn expit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn normal_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    (-0.5 * z * z).exp() / (sd * (2.0 * std::f64::consts::PI).sqrt())
}

/// Solve `X' W X β = X' W z`.
fn weighted_least_squares(
    x: &DMatrix<f64>,
    weights: &DVector<f64>,
    z: &DVector<f64>,
) -> Option<DVector<f64>> {
    let mut wx = x.clone();
    for i in 0..wx.nrows() {
        for j in 0..wx.ncols() {
            wx[(i, j)] *= weights[i];
        }
    }
    let xtwx = x.transpose() * &wx;
    let xtwz = wx.transpose() * z;
    xtwx.cholesky().map(|c| c.solve(&xtwz))
}

/// A fitted GLM `response ~ covariates`.
#[derive(Debug, Clone)]
pub struct Glm {
    family: Family,
    response: String,
    covariates: Vec<String>,
    coefficients: DVector<f64>,
    /// Residual standard deviation; one for binomial models.
    scale: f64,
    converged: bool,
}

impl Glm {
    pub fn fit(
        data: &Dataset,
        response: &str,
        covariates: &[String],
        family: Family,
        options: &GlmOptions,
    ) -> Result<Self, EstimationError> {
        let ones = vec![1.0; data.n_rows()];
        Self::fit_weighted(data, response, covariates, family, &ones, options)
    }

    /// Fit with one non-negative prior weight per row.
    pub fn fit_weighted(
        data: &Dataset,
        response: &str,
        covariates: &[String],
        family: Family,
        weights: &[f64],
        options: &GlmOptions,
    ) -> Result<Self, EstimationError> {
        if weights.len() != data.n_rows() {
            return Err(EstimationError::LengthMismatch {
                name: "weights".into(),
                expected: data.n_rows(),
                found: weights.len(),
            });
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EstimationError::InvalidOption {
                name: "weights".into(),
                reason: format!("{bad} is not a finite non-negative weight"),
            });
        }
        let x = data.design(covariates)?;
        let y = DVector::from_column_slice(data.column(response)?);
        let prior = DVector::from_column_slice(weights);
        let singular = || EstimationError::Singular {
            context: format!("fitting {response} ~ {}", covariates.join(" + ")),
        };

        let (coefficients, scale, converged) = match family {
            Family::Gaussian => {
                let beta = weighted_least_squares(&x, &prior, &y).ok_or_else(singular)?;
                let residuals = &y - &x * &beta;
                let total = prior.sum();
                let mean = residuals.dot(&prior) / total;
                let variance = residuals
                    .iter()
                    .zip(prior.iter())
                    .map(|(r, w)| w * (r - mean).powi(2))
                    .sum::<f64>()
                    / total;
                (beta, variance.sqrt(), true)
            }
            Family::Binomial => {
                let mut beta = DVector::zeros(x.ncols());
                let mut converged = false;
                for iteration in 0..options.max_iterations {
                    let eta = &x * &beta;
                    let mu = eta.map(|e| expit(e).clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR));
                    let variance = mu.map(|m| m * (1.0 - m));
                    let z = DVector::from_fn(x.nrows(), |i, _| {
                        eta[i] + (y[i] - mu[i]) / variance[i]
                    });
                    let working = variance.component_mul(&prior);
                    let next = weighted_least_squares(&x, &working, &z).ok_or_else(singular)?;
                    let delta = (&next - &beta).amax();
                    beta = next;
                    debug!(response, iteration, delta, "IRLS step");
                    if delta < options.tolerance {
                        converged = true;
                        break;
                    }
                }
                if !converged {
                    warn!(
                        response,
                        max_iterations = options.max_iterations,
                        "IRLS did not converge, using last coefficients"
                    );
                }
                (beta, 1.0, converged)
            }
        };

        Ok(Self {
            family,
            response: response.to_string(),
            covariates: covariates.to_vec(),
            coefficients,
            scale,
            converged,
        })
    }

    /// Binomial when the response column is binary, Gaussian otherwise.
    pub fn fit_auto(
        data: &Dataset,
        response: &str,
        covariates: &[String],
        options: &GlmOptions,
    ) -> Result<Self, EstimationError> {
        let ones = vec![1.0; data.n_rows()];
        Self::fit_auto_weighted(data, response, covariates, &ones, options)
    }

    pub fn fit_auto_weighted(
        data: &Dataset,
        response: &str,
        covariates: &[String],
        weights: &[f64],
        options: &GlmOptions,
    ) -> Result<Self, EstimationError> {
        let family = if data.is_binary(response)? {
            Family::Binomial
        } else {
            Family::Gaussian
        };
        Self::fit_weighted(data, response, covariates, family, weights, options)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn covariates(&self) -> &[String] {
        &self.covariates
    }

    /// Intercept first, then one coefficient per covariate.
    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Conditional mean of the response at every row of `data`.
    pub fn predict(&self, data: &Dataset) -> Result<Vec<f64>, EstimationError> {
        let eta = data.design(&self.covariates)? * &self.coefficients;
        Ok(match self.family {
            Family::Gaussian => eta.iter().copied().collect(),
            Family::Binomial => eta.iter().map(|&e| expit(e)).collect(),
        })
    }

    /// Probability (binomial) or density (Gaussian) of the response value
    /// observed at every row of `data`, given that row's covariates.
    pub fn density(&self, data: &Dataset) -> Result<Vec<f64>, EstimationError> {
        let observed = data.column(&self.response)?;
        let means = self.predict(data)?;
        Ok(observed
            .iter()
            .zip(means)
            .map(|(&y, m)| match self.family {
                Family::Binomial if y == 1.0 => m,
                Family::Binomial => 1.0 - m,
                Family::Gaussian => normal_pdf(y, m, self.scale.max(PROBABILITY_FLOOR)),
            })
            .collect())
    }
}
