//! Nested IPW and augmented nested IPW.
//!
//! Every district `D` of `G[Y*]` that meets `dis(T)` contributes the weight
//! `q_D(D | pa(D)) / Π_{V ∈ D} p(V | mp(V))`. Under the reweighted law each
//! such district follows its intrinsic kernel, the treatment is no longer
//! confounded with the outcome, and both estimators become normalized
//! weighted averages of the usual IPW and AIPW terms.

use causa_core::constants::PROBABILITY_FLOOR;
use causa_core::errors::{format_vertex_set, EstimationError};
use causa_graphs::VertexSet;
use tracing::debug;

use super::{CounterfactualMean, Estimator};
use crate::dataset::Dataset;
use crate::glm::{Family, Glm};

fn inverse(probabilities: &[f64]) -> Vec<f64> {
    probabilities.iter().map(|p| 1.0 / p.max(PROBABILITY_FLOOR)).collect()
}

fn multiply(into: &mut [f64], factor: Vec<f64>) {
    for (a, b) in into.iter_mut().zip(factor) {
        *a *= b;
    }
}

fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, EstimationError> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(EstimationError::Singular {
            context: "normalizing nested IPW weights".into(),
        });
    }
    Ok(values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total)
}

impl CounterfactualMean {
    fn nested_pillow(&self, vertex: &str) -> Vec<String> {
        self.graph
            .markov_pillow([vertex], &self.nested_order)
            .into_iter()
            .collect()
    }

    fn weighted_density(
        &self,
        data: &Dataset,
        vertex: &str,
        covariates: &[String],
        weights: &[f64],
    ) -> Result<Vec<f64>, EstimationError> {
        Glm::fit_auto_weighted(data, vertex, covariates, weights, &self.glm_options)?.density(data)
    }

    /// Estimate of the intrinsic kernel `q_D(D | pa(D))` at every row.
    ///
    /// Works in the ancestral subgraph of `D`. Childless vertices are fixed
    /// by marginalizing; any other fixable vertex is fixed by dividing by
    /// its conditional given its Markov blanket, fit under the weights
    /// collected so far. Once the parents of `D` are fixable they are fixed
    /// the same way, and each member of `D` is then fit on the parents and
    /// its predecessors in `D`.
    pub(super) fn intrinsic_kernel(&self, data: &Dataset, district: &VertexSet) -> Result<Vec<f64>, EstimationError> {
        let parents: VertexSet = self
            .graph
            .parents(district)
            .difference(district)
            .cloned()
            .collect();
        let mut cadmg = self.graph.subgraph(self.graph.ancestors(district));
        let mut remaining: VertexSet = cadmg
            .random_vertices()
            .into_iter()
            .filter(|v| !district.contains(v) && !parents.contains(v))
            .collect();
        let mut fixing_prob = vec![1.0; data.n_rows()];

        while !cadmg.fixable(&parents).0 {
            let childless = remaining
                .iter()
                .find(|v| cadmg.children([v.as_str()]).is_empty())
                .cloned();
            if let Some(vertex) = childless {
                cadmg.fix([&vertex])?;
                remaining.remove(&vertex);
                continue;
            }
            let Some(vertex) = remaining.iter().find(|v| cadmg.is_fixable(v)).cloned() else {
                return Err(EstimationError::UnsupportedFunctional {
                    reason: format!(
                        "kernel of {} cannot be reached by fixing",
                        format_vertex_set(district)
                    ),
                });
            };
            let blanket: Vec<String> = cadmg.markov_blanket([&vertex]).into_iter().collect();
            let density = self.weighted_density(data, &vertex, &blanket, &inverse(&fixing_prob))?;
            multiply(&mut fixing_prob, density);
            cadmg.fix([&vertex])?;
            remaining.remove(&vertex);
            debug!(vertex = %vertex, "reweighted to fix");
        }

        let blanket = cadmg.markov_blanket(&parents);
        for parent in &parents {
            let pre = self.graph.pre([parent], &self.nested_order);
            let covariates: Vec<String> = blanket.intersection(&pre).cloned().collect();
            let density = self.weighted_density(data, parent, &covariates, &inverse(&fixing_prob))?;
            multiply(&mut fixing_prob, density);
        }

        let weights = inverse(&fixing_prob);
        let mut kernel = vec![1.0; data.n_rows()];
        for vertex in district {
            let pre = self.graph.pre([vertex], &self.nested_order);
            let mut covariates = parents.clone();
            covariates.extend(district.intersection(&pre).cloned());
            let covariates: Vec<String> = covariates.into_iter().collect();
            multiply(&mut kernel, self.weighted_density(data, vertex, &covariates, &weights)?);
        }
        Ok(kernel)
    }

    /// Weights moving every district of `G[Y*]` that meets `dis(T)` onto
    /// its intrinsic kernel.
    fn nested_weights(&self, data: &Dataset, estimator: Estimator) -> Result<Vec<f64>, EstimationError> {
        let one_line = self
            .one_line
            .as_ref()
            .ok_or_else(|| Self::not_identified(estimator))?;
        let treatment_district = self.graph.district(&self.treatment);
        let mut weights = vec![1.0; data.n_rows()];
        for district in one_line.ystar_graph().districts() {
            if district.is_disjoint(&treatment_district) {
                continue;
            }
            for vertex in &district {
                let model = Glm::fit_auto(data, vertex, &self.nested_pillow(vertex), &self.glm_options)?;
                multiply(&mut weights, inverse(&model.density(data)?));
            }
            multiply(&mut weights, self.intrinsic_kernel(data, &district)?);
            debug!(district = ?district, "district rebalanced");
        }
        Ok(weights)
    }

    /// `p(T | mp(T))` under the nested order, fit with `weights`.
    fn nested_propensity(&self, data: &Dataset, weights: &[f64]) -> Result<Vec<f64>, EstimationError> {
        Glm::fit_weighted(
            data,
            &self.treatment,
            &self.nested_pillow(&self.treatment),
            Family::Binomial,
            weights,
            &self.glm_options,
        )?
        .density(data)
    }

    pub(super) fn nested_ipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let weights = self.nested_weights(data, Estimator::NestedIpw)?;
        let propensity = self.nested_propensity(data, &weights)?;
        let indicator = self.indicator(data, assignment)?;
        let y = data.column(&self.outcome)?;
        let inverse_propensity: Vec<f64> = (0..data.n_rows())
            .map(|i| weights[i] * indicator[i] / propensity[i].max(PROBABILITY_FLOOR))
            .collect();
        weighted_mean(y, &inverse_propensity)
    }

    pub(super) fn augmented_nested_ipw(&self, data: &Dataset, assignment: f64) -> Result<f64, EstimationError> {
        let weights = self.nested_weights(data, Estimator::AugmentedNestedIpw)?;
        let propensity = self.nested_propensity(data, &weights)?;
        let indicator = self.indicator(data, assignment)?;
        let y = data.column(&self.outcome)?;

        let mut covariates = vec![self.treatment.clone()];
        covariates.extend(self.nested_pillow(&self.treatment));
        let regression = Glm::fit_auto_weighted(data, &self.outcome, &covariates, &weights, &self.glm_options)?
            .predict(&data.assign(&self.treatment, assignment)?)?;

        let augmented: Vec<f64> = (0..data.n_rows())
            .map(|i| {
                indicator[i] / propensity[i].max(PROBABILITY_FLOOR) * (y[i] - regression[i])
                    + regression[i]
            })
            .collect();
        weighted_mean(&augmented, &weights)
    }
}
