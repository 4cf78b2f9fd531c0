//! # causa-models
//!
//! Parametric models over causal graphs. Currently the linear Gaussian SEM
//! of an ADMG, fitted by residual iterative conditional fitting.

pub mod linear_gaussian_sem;
mod ricf;

pub use linear_gaussian_sem::{FitOptions, LinearGaussianSem};
