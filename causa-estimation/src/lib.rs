//! # causa-estimation
//!
//! Estimation of identified causal quantities from observed data.
//!
//! - [`Dataset`]: named `f64` columns with bootstrap resampling.
//! - [`Glm`]: Gaussian and binomial GLMs used as nuisance models.
//! - [`PlugInEvaluator`]: numeric value of any identifying functional
//!   under the empirical distribution.
//! - [`CounterfactualMean`]: IPW, g-formula, AIPW, primal/dual/augmented
//!   primal IPW, their efficient variants, nested IPW and plug-in
//!   estimates of `E[Y(t)]`, and effects with bootstrap intervals.
//! - [`AutomatedIf`]: symbolic influence functions and their standard errors.

pub mod automated_if;
pub mod counterfactual_mean;
pub mod dataset;
pub mod evaluate;
pub mod glm;

pub use automated_if::AutomatedIf;
pub use counterfactual_mean::{CounterfactualMean, Effect, EffectOptions, EffectScale, Estimator, Strategy};
pub use dataset::Dataset;
pub use evaluate::PlugInEvaluator;
pub use glm::{Family, Glm, GlmOptions};
