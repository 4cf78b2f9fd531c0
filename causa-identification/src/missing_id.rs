//! Identification in missing-data ADMGs.
//!
//! Vertices follow the `X_i` / `R_i` / `Xp_i` naming of
//! [`causa_graphs::missing`]: counterfactual, missingness indicator and
//! observed proxy.

use std::sync::Arc;

use causa_core::errors::{format_vertex_set, GraphError, IdentificationError};
use causa_core::identification_span;
use causa_graphs::{Graph, VertexRole, VertexSet};
use tracing::{debug, info};

use crate::functional::{Functional, Kernel};

/// Full-law identification.
///
/// The full law is identified iff no indicator `R_i` has a colluding
/// path to `X_i`: `X_i` must lie outside `mb({R_i} ∪ ch_R) ∪ ch_R`, where
/// `ch_R` are the indicators among the children of `R_i`.
#[derive(Debug, Clone)]
pub struct MissingFullId {
    graph: Arc<Graph>,
}

impl MissingFullId {
    pub fn new(graph: &Graph) -> Self {
        Self {
            graph: Arc::new(graph.clone()),
        }
    }

    /// `Ok` when the full law is identified. Otherwise the error names the
    /// colluding set of the first failing indicator.
    pub fn id(&self) -> Result<(), IdentificationError> {
        let indicators = self.graph.indicators();
        let _span = identification_span!("missing_full", indicators, self.graph.counterfactuals()).entered();
        for indicator in &indicators {
            let Some(counterfactual) = self.graph.counterfactual_of(indicator) else {
                continue;
            };
            let colluding = self.colluding_set(indicator);
            if colluding.contains(&counterfactual) {
                debug!(indicator = %indicator, colluding = ?colluding, "colluding path found");
                return Err(IdentificationError::NotIdentified {
                    district: format_vertex_set(&colluding),
                    reason: format!("colluding path between {counterfactual} and {indicator}"),
                });
            }
        }
        info!(indicators = indicators.len(), "full law identified");
        Ok(())
    }

    /// `mb({R_i} ∪ ch_R) ∪ ch_R` for an indicator `R_i`.
    pub fn colluding_set(&self, indicator: &str) -> VertexSet {
        let child_indicators: VertexSet = self
            .graph
            .children([indicator])
            .into_iter()
            .filter(|v| self.graph.role(v) == Some(VertexRole::MissingnessIndicator))
            .collect();
        let mut family = child_indicators.clone();
        family.insert(indicator.to_string());
        let mut colluding = self.graph.markov_blanket(&family);
        colluding.extend(child_indicators);
        colluding
    }
}

/// Target-law identification of the marginal law of some counterfactuals.
///
/// Missingness indicators are fixed first: an indicator can be fixed when
/// it is fixable in the current CADMG and its counterfactual is outside its
/// Markov blanket. When no indicator can be fixed, a counterfactual outside
/// the target whose indicator is already fixed may be fixed to unblock the
/// rest. The target law is identified once every indicator is fixed.
#[derive(Debug, Clone)]
pub struct MissingTargetId {
    graph: Arc<Graph>,
    targets: VertexSet,
    fixing_order: Option<Vec<String>>,
}

impl MissingTargetId {
    pub fn new<S: AsRef<str>>(
        graph: &Graph,
        targets: impl IntoIterator<Item = S>,
    ) -> Result<Self, IdentificationError> {
        let mut set = VertexSet::new();
        for target in targets {
            let target = target.as_ref();
            if !graph.contains(target) {
                return Err(GraphError::UnknownVertex {
                    name: target.to_string(),
                }
                .into());
            }
            set.insert(target.to_string());
        }
        if set.is_empty() {
            return Err(IdentificationError::InvalidQuery {
                reason: "no target vertices given".into(),
            });
        }
        Ok(Self {
            graph: Arc::new(graph.clone()),
            targets: set,
            fixing_order: None,
        })
    }

    pub fn targets(&self) -> &VertexSet {
        &self.targets
    }

    /// Order in which indicators and unblocking counterfactuals were fixed,
    /// once [`Self::id`] succeeded.
    pub fn fixing_order(&self) -> Option<&[String]> {
        self.fixing_order.as_deref()
    }

    fn indicator_fixable(cadmg: &Graph, indicator: &str) -> bool {
        cadmg.is_fixable(indicator)
            && cadmg
                .counterfactual_of(indicator)
                .map_or(true, |x| !cadmg.markov_blanket([indicator]).contains(&x))
    }

    fn unblocking_counterfactual(&self, cadmg: &Graph) -> Option<String> {
        cadmg.counterfactuals().into_iter().find(|x| {
            !self.targets.contains(x)
                && cadmg.is_fixable(x)
                && cadmg.indicator_of(x).is_some_and(|r| cadmg.is_fixed(&r))
        })
    }

    pub fn id(&mut self) -> Result<(), IdentificationError> {
        let _span = identification_span!("missing_target", self.graph.indicators(), self.targets).entered();
        self.fixing_order = None;

        let mut cadmg = (*self.graph).clone();
        let mut order = Vec::new();
        loop {
            let pending: Vec<String> = cadmg
                .indicators()
                .into_iter()
                .filter(|r| !cadmg.is_fixed(r))
                .collect();
            if pending.is_empty() {
                break;
            }

            let ready: Vec<String> = pending
                .iter()
                .filter(|r| Self::indicator_fixable(&cadmg, r))
                .cloned()
                .collect();
            if !ready.is_empty() {
                for indicator in ready {
                    // Fixing one indicator never makes another unfixable.
                    cadmg.fix([&indicator])?;
                    debug!(indicator = %indicator, "fixed indicator");
                    order.push(indicator);
                }
                continue;
            }

            let Some(counterfactual) = self.unblocking_counterfactual(&cadmg) else {
                return Err(IdentificationError::NotIdentified {
                    district: format_vertex_set(&pending),
                    reason: "missingness indicators cannot be fixed".into(),
                });
            };
            cadmg.fix([&counterfactual])?;
            debug!(counterfactual = %counterfactual, "fixed counterfactual to unblock indicators");
            order.push(counterfactual);
        }

        info!(order = ?order, "target law identified");
        self.fixing_order = Some(order);
        Ok(())
    }

    /// The target law in terms of observed columns: the fixing kernel over
    /// [`Graph::proxy_view`], every random vertex outside the targets summed
    /// out and every indicator bound to one. Counterfactuals appear under
    /// their proxy names, including the targets and any counterfactual fixed
    /// to unblock an indicator, which stays a free argument.
    pub fn functional(&self) -> Result<Functional, IdentificationError> {
        let order = self.fixing_order.as_ref().ok_or(IdentificationError::State {
            operation: "functional",
            requires: "id",
        })?;
        let view = self.graph.proxy_view()?;
        let order: Vec<String> = order.iter().map(|v| self.graph.observed_name(v)).collect();
        let targets: VertexSet = self.targets.iter().map(|v| self.graph.observed_name(v)).collect();

        let mut cadmg = view.clone();
        cadmg.fix(&order)?;
        let remaining = cadmg.random_vertices();
        let over: VertexSet = remaining.difference(&targets).cloned().collect();
        let kernel = Functional::Kernel(Kernel {
            district: remaining,
            fixing_order: order,
            experiment: VertexSet::new(),
            graph: Arc::new(view),
        });
        let mut functional = Functional::sum(over, kernel);
        for indicator in self.graph.indicators().into_iter().rev() {
            functional = Functional::bind(indicator, 1.0, functional);
        }
        Ok(functional)
    }
}
