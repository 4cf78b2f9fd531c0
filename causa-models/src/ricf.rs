//! Residual iterative conditional fitting (Drton, Eichler and Richardson,
//! 2009) for linear Gaussian SEMs on ADMGs.
//!
//! Each sweep visits every vertex `i` and, holding the rest fixed,
//! regresses `X_i` on its parents and on the pseudo-variables
//! `Z = (Ω_{-i,-i}^{-1} ε_{-i})_{sp(i)}` built from the other residuals. The
//! regression gives row `i` of `B` and the covariances of `ε_i` with its
//! spouses; the residual variance then gives `ω_ii`.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use causa_core::errors::ModelError;

/// Parents and spouses of every vertex, as column indices.
#[derive(Debug, Clone)]
pub(crate) struct Structure {
    pub parents: Vec<Vec<usize>>,
    pub spouses: Vec<Vec<usize>>,
}

/// `B` has `B[(i, j)]` as the coefficient of `j` in the equation of `i`.
#[derive(Debug, Clone)]
pub(crate) struct Parameters {
    pub b: DMatrix<f64>,
    pub omega: DMatrix<f64>,
}

impl Parameters {
    /// `B = 0` and `Ω = diag(S)`.
    pub fn initial(covariance: &DMatrix<f64>) -> Self {
        let p = covariance.nrows();
        Self {
            b: DMatrix::zeros(p, p),
            omega: DMatrix::from_diagonal(&covariance.diagonal()),
        }
    }

    /// `Σ = (I - B)^{-1} Ω (I - B)^{-T}`.
    pub fn implied_covariance(&self) -> Result<DMatrix<f64>, ModelError> {
        let p = self.b.nrows();
        let inverse = (DMatrix::identity(p, p) - &self.b)
            .try_inverse()
            .ok_or_else(|| ModelError::Singular {
                context: "inverting I - B".into(),
            })?;
        Ok(&inverse * &self.omega * inverse.transpose())
    }
}

/// Gaussian negative log-likelihood of `n` rows with sample covariance
/// `sample` under covariance `sigma`, at the sample mean.
pub(crate) fn neg_log_likelihood(sigma: &DMatrix<f64>, sample: &DMatrix<f64>, n: usize) -> Result<f64, ModelError> {
    let p = sigma.nrows() as f64;
    let cholesky = sigma.clone().cholesky().ok_or_else(|| ModelError::Singular {
        context: "factorizing the implied covariance".into(),
    })?;
    let log_det = 2.0 * cholesky.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();
    let trace = (cholesky.inverse() * sample).trace();
    Ok(0.5 * n as f64 * (p * (2.0 * PI).ln() + log_det + trace))
}

/// One RICF sweep over every vertex, updating `params` in place.
pub(crate) fn sweep(
    centered: &DMatrix<f64>,
    structure: &Structure,
    params: &mut Parameters,
) -> Result<(), ModelError> {
    let (n, p) = centered.shape();
    for i in 0..p {
        let parents = &structure.parents[i];
        let spouses = &structure.spouses[i];
        let others: Vec<usize> = (0..p).filter(|&j| j != i).collect();

        let mut design = DMatrix::zeros(n, parents.len() + spouses.len());
        for (k, &j) in parents.iter().enumerate() {
            design.set_column(k, &centered.column(j));
        }

        let omega_inverse = if spouses.is_empty() {
            None
        } else {
            let inverse = params
                .omega
                .select_rows(&others)
                .select_columns(&others)
                .try_inverse()
                .ok_or_else(|| ModelError::Singular {
                    context: format!("inverting the error covariance without vertex {i}"),
                })?;
            let residuals = centered - centered * params.b.transpose();
            let pseudo = residuals.select_columns(&others) * &inverse;
            for (k, s) in spouses.iter().enumerate() {
                let position = others.iter().position(|o| o == s).unwrap_or_default();
                design.set_column(parents.len() + k, &pseudo.column(position));
            }
            Some(inverse)
        };

        let response = centered.column(i).into_owned();
        let coefficients = least_squares(&design, &response).ok_or_else(|| ModelError::Singular {
            context: format!("regressing vertex {i} on its parents and spouses"),
        })?;
        let residual = &response - &design * &coefficients;

        for j in 0..p {
            params.b[(i, j)] = 0.0;
        }
        for (k, &j) in parents.iter().enumerate() {
            params.b[(i, j)] = coefficients[k];
        }
        for (k, &s) in spouses.iter().enumerate() {
            let value = coefficients[parents.len() + k];
            params.omega[(i, s)] = value;
            params.omega[(s, i)] = value;
        }

        let mut variance = residual.norm_squared() / n as f64;
        if let Some(inverse) = omega_inverse {
            let cross = DVector::from_iterator(others.len(), others.iter().map(|&j| params.omega[(i, j)]));
            variance += (cross.transpose() * inverse * &cross)[(0, 0)];
        }
        params.omega[(i, i)] = variance;
    }
    Ok(())
}

/// Solve `(D'D) β = D'y`; an empty design gives an empty solution.
fn least_squares(design: &DMatrix<f64>, response: &DVector<f64>) -> Option<DVector<f64>> {
    if design.ncols() == 0 {
        return Some(DVector::zeros(0));
    }
    let gram = design.transpose() * design;
    gram.cholesky().map(|c| c.solve(&(design.transpose() * response)))
}
