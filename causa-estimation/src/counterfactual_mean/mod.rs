//! Estimation of counterfactual means `E[Y(t)]` for a single binary
//! treatment in an ADMG.
//!
//! The treatment decides which estimators apply:
//!
//! - **a-fixable** (`dis(T) ∩ de(T) = {T}`): IPW, g-formula and AIPW, plus
//!   everything valid for p-fixable treatments.
//! - **p-fixable** (`dis(T) ∩ ch(T) = ∅`): primal IPW, dual IPW and
//!   augmented primal IPW, plus everything valid for nested fixable ones.
//! - **nested fixable** (identified by one-line ID): nested IPW, augmented
//!   nested IPW and plug-in evaluation of the identifying functional.
//!
//! The efficient variants of AIPW and augmented primal IPW also need an
//! mb-shielded graph.
//!
//! Nuisance models are GLMs on the Markov pillow of each vertex under a
//! valid topological order.

mod nested;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use causa_core::config::EstimationConfig;
use causa_core::constants::PROBABILITY_FLOOR;
use causa_core::errors::{EstimationError, GraphError};
use causa_core::estimation_span;
use causa_graphs::{Graph, VertexSet};
use causa_identification::{Functional, OneLineId};

use crate::dataset::Dataset;
use crate::evaluate::PlugInEvaluator;
use crate::glm::{Family, Glm, GlmOptions};

/// Response column used when projecting pseudo-outcomes.
const PROJECTION_RESPONSE: &str = "__projection";

/// How the treatment can be fixed, which decides the valid estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    AFixable,
    PFixable,
    NestedFixable,
    NotIdentified,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::AFixable => "a-fixable",
            Strategy::PFixable => "p-fixable",
            Strategy::NestedFixable => "nested fixable",
            Strategy::NotIdentified => "not identified",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Estimator {
    Ipw,
    Gformula,
    Aipw,
    EfficientAipw,
    PrimalIpw,
    DualIpw,
    Apipw,
    EfficientApipw,
    NestedIpw,
    AugmentedNestedIpw,
    PlugIn,
}

impl Estimator {
    pub const ALL: [Estimator; 11] = [
        Estimator::Ipw,
        Estimator::Gformula,
        Estimator::Aipw,
        Estimator::EfficientAipw,
        Estimator::PrimalIpw,
        Estimator::DualIpw,
        Estimator::Apipw,
        Estimator::EfficientApipw,
        Estimator::NestedIpw,
        Estimator::AugmentedNestedIpw,
        Estimator::PlugIn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Estimator::Ipw => "ipw",
            Estimator::Gformula => "gformula",
            Estimator::Aipw => "aipw",
            Estimator::EfficientAipw => "eff-aipw",
            Estimator::PrimalIpw => "p-ipw",
            Estimator::DualIpw => "d-ipw",
            Estimator::Apipw => "apipw",
            Estimator::EfficientApipw => "eff-apipw",
            Estimator::NestedIpw => "n-ipw",
            Estimator::AugmentedNestedIpw => "anipw",
            Estimator::PlugIn => "plug-in",
        }
    }

    fn is_efficient(self) -> bool {
        matches!(self, Estimator::EfficientAipw | Estimator::EfficientApipw)
    }

    /// Whether the estimator is consistent for a treatment with `strategy`
    /// in a graph that is (or is not) mb-shielded.
    pub fn valid_for(self, strategy: Strategy, mb_shielded: bool) -> bool {
        let fixable = match strategy {
            Strategy::AFixable => true,
            Strategy::PFixable => !matches!(
                self,
                Estimator::Ipw | Estimator::Gformula | Estimator::Aipw | Estimator::EfficientAipw
            ),
            Strategy::NestedFixable => matches!(
                self,
                Estimator::NestedIpw | Estimator::AugmentedNestedIpw | Estimator::PlugIn
            ),
            Strategy::NotIdentified => false,
        };
        fixable && (mb_shielded || !self.is_efficient())
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bootstrap settings of [`CounterfactualMean::compute_effect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectOptions {
    /// Zero disables the interval.
    pub n_bootstraps: usize,
    pub alpha: f64,
    pub seed: u64,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self::from(&EstimationConfig::default())
    }
}

impl From<&EstimationConfig> for EffectOptions {
    fn from(config: &EstimationConfig) -> Self {
        Self {
            n_bootstraps: config.n_bootstraps,
            alpha: config.alpha,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectScale {
    /// `E[Y(1)] - E[Y(0)]`.
    AverageCausalEffect,
    /// Log odds ratio of `E[Y(1)]` against `E[Y(0)]`, for binary outcomes.
    LogOddsRatio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub estimate: f64,
    pub scale: EffectScale,
    /// Bootstrap quantile interval at level `1 - alpha`.
    pub interval: Option<(f64, f64)>,
}

/// Counterfactual mean of `outcome` under an intervention on `treatment`.
#[derive(Debug, Clone)]
pub struct CounterfactualMean {
    graph: Arc<Graph>,
    treatment: String,
    outcome: String,
    strategy: Strategy,
    mb_shielded: bool,
    order: Vec<String>,
    /// Order with the non-descendants of `Y* ∩ dis(T)` first, used by the
    /// nested estimators.
    nested_order: Vec<String>,
    one_line: Option<OneLineId>,
    glm_options: GlmOptions,
}

/// Topological order placing every non-descendant of `focal` first.
fn valid_order(graph: &Graph, focal: &VertexSet) -> Result<Vec<String>, GraphError> {
    let descendants = graph.descendants(focal);
    let (mut order, after): (Vec<String>, Vec<String>) = graph
        .topological_sort()?
        .into_iter()
        .partition(|v| !descendants.contains(v));
    order.extend(after);
    Ok(order)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let (lo, hi) = (position.floor() as usize, position.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR);
    (p / (1.0 - p)).ln()
}

impl CounterfactualMean {
    pub fn new(graph: &Graph, treatment: &str, outcome: &str) -> Result<Self, EstimationError> {
        for vertex in [treatment, outcome] {
            if !graph.contains(vertex) {
                return Err(GraphError::UnknownVertex {
                    name: vertex.to_string(),
                }
                .into());
            }
        }

        let mut one_line = OneLineId::new(graph, [treatment], [outcome])?;
        let one_line = match one_line.id() {
            Ok(()) => Some(one_line),
            Err(e) => {
                debug!(error = %e, "one-line ID failed");
                None
            }
        };

        let district = graph.district(treatment);
        let descendants = graph.descendants([treatment]);
        let strategy = if district.intersection(&descendants).count() == 1 {
            Strategy::AFixable
        } else if district.is_disjoint(&graph.children([treatment])) {
            Strategy::PFixable
        } else if one_line.is_some() {
            Strategy::NestedFixable
        } else {
            Strategy::NotIdentified
        };

        let focal = VertexSet::from([treatment.to_string()]);
        let order = valid_order(graph, &focal)?;
        let nested_focal: VertexSet = one_line
            .as_ref()
            .map(|q| q.ystar().intersection(&district).cloned().collect())
            .unwrap_or_default();
        let nested_order = valid_order(graph, &nested_focal)?;
        let mb_shielded = graph.mb_shielded();
        info!(treatment, outcome, strategy = %strategy, mb_shielded, "counterfactual mean set up");

        Ok(Self {
            graph: Arc::new(graph.clone()),
            treatment: treatment.to_string(),
            outcome: outcome.to_string(),
            strategy,
            mb_shielded,
            order,
            nested_order,
            one_line,
            glm_options: GlmOptions::default(),
        })
    }

    pub fn with_glm_options(mut self, options: GlmOptions) -> Self {
        self.glm_options = options;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn mb_shielded(&self) -> bool {
        self.mb_shielded
    }

    /// Topological order with the non-descendants of the treatment first.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Estimators applicable to this treatment.
    pub fn valid_estimators(&self) -> Vec<Estimator> {
        Estimator::ALL
            .into_iter()
            .filter(|e| e.valid_for(self.strategy, self.mb_shielded))
            .collect()
    }

    /// Plug-in point estimate of an arbitrary functional.
    pub fn estimate(&self, data: &Dataset, functional: &Functional) -> Result<f64, EstimationError> {
        PlugInEvaluator::new(data).evaluate(functional)
    }

    /// `E[Y(t)]` by `estimator`.
    pub fn estimate_mean(
        &self,
        data: &Dataset,
        estimator: Estimator,
        assignment: f64,
    ) -> Result<f64, EstimationError> {
        if !estimator.valid_for(self.strategy, self.mb_shielded) {
            let strategy = if estimator.valid_for(self.strategy, true) {
                format!("{} (not mb-shielded)", self.strategy)
            } else {
                self.strategy.to_string()
            };
            return Err(EstimationError::InvalidStrategy {
                estimator: estimator.to_string(),
                strategy,
            });
        }
        let _span = estimation_span!(estimator, self.treatment, self.outcome).entered();

        let value = match estimator {
            Estimator::Ipw => self.ipw(data, assignment)?,
            Estimator::Gformula => mean(&self.gformula(data, assignment)?),
            Estimator::Aipw => self.aipw(data, assignment)?,
            Estimator::EfficientAipw => self.eff_aipw(data, assignment)?,
            Estimator::PrimalIpw => mean(&self.primal(data, assignment)?),
            Estimator::DualIpw => mean(&self.dual(data, assignment)?),
            Estimator::Apipw => self.apipw(data, assignment)?,
            Estimator::EfficientApipw => self.eff_apipw(data, assignment)?,
            Estimator::NestedIpw => self.nested_ipw(data, assignment)?,
            Estimator::AugmentedNestedIpw => self.augmented_nested_ipw(data, assignment)?,
            Estimator::PlugIn => self.plug_in(data, assignment)?,
        };
        debug!(assignment, value, "counterfactual mean estimated");
        Ok(value)
    }

    /// Contrast of `E[Y(1)]` and `E[Y(0)]`: a difference for continuous
    /// outcomes, a log odds ratio for binary ones.
    pub fn compute_effect(
        &self,
        data: &Dataset,
        estimator: Estimator,
        options: &EffectOptions,
    ) -> Result<Effect, EstimationError> {
        if options.n_bootstraps > 0 && !(options.alpha > 0.0 && options.alpha < 1.0) {
            return Err(EstimationError::InvalidOption {
                name: "alpha".into(),
                reason: format!("{} is outside (0, 1)", options.alpha),
            });
        }
        let scale = if data.is_binary(&self.outcome)? {
            EffectScale::LogOddsRatio
        } else {
            EffectScale::AverageCausalEffect
        };
        let estimate = self.contrast(data, estimator, scale)?;

        let interval = if options.n_bootstraps > 0 {
            let mut rng = StdRng::seed_from_u64(options.seed);
            let mut replicates = (0..options.n_bootstraps)
                .map(|_| self.contrast(&data.resample(&mut rng), estimator, scale))
                .collect::<Result<Vec<_>, _>>()?;
            replicates.sort_by(f64::total_cmp);
            Some((
                quantile(&replicates, options.alpha / 2.0),
                quantile(&replicates, 1.0 - options.alpha / 2.0),
            ))
        } else {
            None
        };

        info!(estimator = %estimator, estimate, ?interval, "effect computed");
        Ok(Effect {
            estimate,
            scale,
            interval,
        })
    }

    fn contrast(&self, data: &Dataset, estimator: Estimator, scale: EffectScale) -> Result<f64, EstimationError> {
        let treated = self.estimate_mean(data, estimator, 1.0)?;
        let control = self.estimate_mean(data, estimator, 0.0)?;
        Ok(match scale {
            EffectScale::AverageCausalEffect => treated - control,
            EffectScale::LogOddsRatio => logit(treated) - logit(control),
        })
    }

    fn pillow(&self, vertex: &str) -> Vec<String> {
        self.graph.markov_pillow([vertex], &self.order).into_iter().collect()
    }

    fn fit(&self, data: &Dataset, vertex: &str) -> Result<Glm, EstimationError> {
        Glm::fit_auto(data, vertex, &self.pillow(vertex), &self.glm_options)
    }

    /// Treatment model `p(T = 1 | mp(T))`.
    fn propensity(&self, data: &Dataset) -> Result<Glm, EstimationError> {
        Glm::fit(
            data,
            &self.treatment,
            &self.pillow(&self.treatment),
            Family::Binomial,
            &self.glm_options,
        )
    }

    fn indicator(&self, data: &Dataset, assignment: f64) -> Result<Vec<f64>, EstimationError> {
        Ok(data
            .column(&self.treatment)?
            .iter()
            .map(|&t| if t == assignment { 1.0 } else { 0.0 })
            .collect())
    }

    /// Per-row `I(T = t) / p(T | mp(T)) * Y`.
    fn ipw_terms(&self, data: &Dataset, assignment: f64) -> Result<Vec<f64>, EstimationError> {
        let propensity = self.propensity(data)?.density(data)?;
        let indicator = self.indicator(data, assignment)?;
        let y = data.column(&self.outcome)?;
        Ok(indicator
            .iter()
            .zip(propensity)
            .zip(y)
            .map(|((i, p), y)| i / p.max(PROBABILITY_FLOOR) * y)
            .collect())
    }

    fn ipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        Ok(mean(&self.ipw_terms(data, assignment)?))
    }

    /// Outcome regression `E[Y | T = t, mp(T)]` at every row.
    fn gformula(&self, data: &Dataset, assignment: f64) -> Result<Vec<f64>, EstimationError> {
        let mut covariates = vec![self.treatment.clone()];
        covariates.extend(self.pillow(&self.treatment));
        let model = Glm::fit_auto(data, &self.outcome, &covariates, &self.glm_options)?;
        model.predict(&data.assign(&self.treatment, assignment)?)
    }

    fn aipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let propensity = self.propensity(data)?.density(data)?;
        let indicator = self.indicator(data, assignment)?;
        let regression = self.gformula(data, assignment)?;
        let y = data.column(&self.outcome)?;
        let augmented: Vec<f64> = (0..data.n_rows())
            .map(|i| {
                indicator[i] / propensity[i].max(PROBABILITY_FLOOR) * (y[i] - regression[i])
                    + regression[i]
            })
            .collect();
        Ok(mean(&augmented))
    }

    /// `dis(T)` outside the pre-treatment vertices.
    fn district_post(&self) -> VertexSet {
        let pre = self.graph.pre([&self.treatment], &self.order);
        self.graph
            .district(&self.treatment)
            .into_iter()
            .filter(|v| !pre.contains(v))
            .collect()
    }

    /// Vertices with the treatment in their Markov pillow, outside `dis(T)`.
    fn mediators(&self) -> VertexSet {
        let district = self.graph.district(&self.treatment);
        self.order
            .iter()
            .filter(|v| !district.contains(*v) && self.pillow(v).contains(&self.treatment))
            .cloned()
            .collect()
    }

    /// Per-row primal IPW pseudo-outcomes.
    fn primal(&self, data: &Dataset, assignment: f64) -> Result<Vec<f64>, EstimationError> {
        let treated = data.assign(&self.treatment, 1.0)?;
        let control = data.assign(&self.treatment, 0.0)?;

        let propensity = self.propensity(data)?;
        let mut prob = propensity.density(data)?;
        let mut prob_treated = propensity.predict(data)?;
        let mut prob_control: Vec<f64> = prob_treated.iter().map(|p| 1.0 - p).collect();

        let district = self.district_post();
        for vertex in &district {
            if *vertex == self.treatment || *vertex == self.outcome {
                continue;
            }
            let model = self.fit(data, vertex)?;
            for (p, d) in prob.iter_mut().zip(model.density(data)?) {
                *p *= d;
            }
            for (p, d) in prob_treated.iter_mut().zip(model.density(&treated)?) {
                *p *= d;
            }
            for (p, d) in prob_control.iter_mut().zip(model.density(&control)?) {
                *p *= d;
            }
        }

        let indicator = self.indicator(data, assignment)?;
        if district.contains(&self.outcome) {
            let model = self.fit(data, &self.outcome)?;
            let y_treated = model.predict(&treated)?;
            let y_control = model.predict(&control)?;
            Ok((0..data.n_rows())
                .map(|i| {
                    indicator[i] / prob[i].max(PROBABILITY_FLOOR)
                        * (y_treated[i] * prob_treated[i] + y_control[i] * prob_control[i])
                })
                .collect())
        } else {
            let y = data.column(&self.outcome)?;
            Ok((0..data.n_rows())
                .map(|i| {
                    indicator[i] * (prob_treated[i] + prob_control[i]) / prob[i].max(PROBABILITY_FLOOR)
                        * y[i]
                })
                .collect())
        }
    }

    /// Per-row dual IPW pseudo-outcomes.
    fn dual(&self, data: &Dataset, assignment: f64) -> Result<Vec<f64>, EstimationError> {
        let assigned = data.assign(&self.treatment, assignment)?;
        let mediators = self.mediators();

        let mut ratio = vec![1.0; data.n_rows()];
        for vertex in mediators.iter().filter(|m| **m != self.outcome) {
            let model = self.fit(data, vertex)?;
            let numerator = model.density(&assigned)?;
            let denominator = model.density(data)?;
            for ((r, n), d) in ratio.iter_mut().zip(numerator).zip(denominator) {
                *r *= n / d.max(PROBABILITY_FLOOR);
            }
        }

        let y = if mediators.contains(&self.outcome) {
            self.fit(data, &self.outcome)?.predict(&assigned)?
        } else {
            data.column(&self.outcome)?.to_vec()
        };
        Ok(ratio.iter().zip(y).map(|(r, y)| r * y).collect())
    }

    /// Least-squares regression of `target` on `covariates` and an
    /// intercept; the mean of `target` when there are no covariates.
    fn regress(&self, data: &Dataset, target: &[f64], covariates: &[String]) -> Result<Vec<f64>, EstimationError> {
        let augmented = data.with_column(PROJECTION_RESPONSE, target.to_vec())?;
        Glm::fit(
            &augmented,
            PROJECTION_RESPONSE,
            covariates,
            Family::Gaussian,
            &self.glm_options,
        )?
        .predict(&augmented)
    }

    /// Like [`Self::regress`], but zero when there are no covariates.
    fn project(&self, data: &Dataset, target: &[f64], covariates: &[String]) -> Result<Vec<f64>, EstimationError> {
        if covariates.is_empty() {
            return Ok(vec![0.0; data.n_rows()]);
        }
        self.regress(data, target, covariates)
    }

    /// `Σ_V E[β_V | V, mp(V)] - E[β_V | mp(V)]` at every row, with the
    /// pseudo-outcome `β_V` picked per vertex by `target`.
    fn influence_sum<'b>(
        &self,
        data: &Dataset,
        vertices: &[String],
        target: impl Fn(&str) -> &'b [f64],
    ) -> Result<Vec<f64>, EstimationError> {
        let mut total = vec![0.0; data.n_rows()];
        for vertex in vertices {
            let beta = target(vertex);
            let mut covariates = self.pillow(vertex);
            let without = self.regress(data, beta, &covariates)?;
            covariates.push(vertex.clone());
            let with = self.regress(data, beta, &covariates)?;
            for ((t, w), wo) in total.iter_mut().zip(with).zip(without) {
                *t += w - wo;
            }
        }
        Ok(total)
    }

    /// AIPW with the augmentation taken from the efficient influence
    /// function of an mb-shielded graph.
    fn eff_aipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let primal = self.ipw_terms(data, assignment)?;
        let vertices: Vec<String> = self
            .order
            .iter()
            .filter(|v| **v != self.treatment)
            .cloned()
            .collect();
        let terms = self.influence_sum(data, &vertices, |_| primal.as_slice())?;
        Ok(mean(&terms) + mean(&primal))
    }

    fn apipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let primal = self.primal(data, assignment)?;
        let dual = self.dual(data, assignment)?;
        let mediators = self.mediators();
        let pre_treatment = self.graph.pre([&self.treatment], &self.order);

        let mut total = vec![0.0; data.n_rows()];
        for vertex in self.order.iter().filter(|v| !pre_treatment.contains(*v)) {
            let target = if mediators.contains(vertex) { &primal } else { &dual };
            let mut covariates: Vec<String> = self.graph.pre([vertex], &self.order).into_iter().collect();
            let without = self.project(data, target, &covariates)?;
            covariates.push(vertex.clone());
            let with = self.project(data, target, &covariates)?;
            for ((t, w), wo) in total.iter_mut().zip(with).zip(without) {
                *t += w - wo;
            }
        }

        if !pre_treatment.is_empty() {
            let covariates: Vec<String> = pre_treatment.into_iter().collect();
            for (t, p) in total.iter_mut().zip(self.project(data, &dual, &covariates)?) {
                *t += p;
            }
        }
        Ok(mean(&total))
    }

    /// Efficient augmented primal IPW: post-treatment vertices outside
    /// `dis(T)` project the primal pseudo-outcome, all others the dual.
    fn eff_apipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let primal = self.primal(data, assignment)?;
        let dual = self.dual(data, assignment)?;
        let pre_treatment = self.graph.pre([&self.treatment], &self.order);
        let district = self.graph.district(&self.treatment);
        let terms = self.influence_sum(data, &self.order, |v: &str| {
            if pre_treatment.contains(v) || district.contains(v) {
                dual.as_slice()
            } else {
                primal.as_slice()
            }
        })?;
        Ok(mean(&terms) + mean(&dual))
    }

    fn not_identified(estimator: Estimator) -> EstimationError {
        EstimationError::InvalidStrategy {
            estimator: estimator.to_string(),
            strategy: Strategy::NotIdentified.to_string(),
        }
    }

    fn plug_in(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let one_line = self
            .one_line
            .as_ref()
            .ok_or_else(|| Self::not_identified(Estimator::PlugIn))?;
        let functional = one_line.mean_functional(
            &self.outcome,
            &BTreeMap::from([(self.treatment.clone(), assignment)]),
        )?;
        PlugInEvaluator::new(data).evaluate(&functional)
    }
}
