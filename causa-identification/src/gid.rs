//! Generalized one-line ID: identification from a collection of
//! experimental distributions `p(V | do(E))`.
//!
//! Each district of `G[Y*]` must be reachable in at least one experiment:
//! with `E` fixed first (and disjoint from the district), the remaining
//! vertices outside the district must be fixable. The empty experiment is
//! the observational law.

use std::collections::BTreeMap;
use std::sync::Arc;

use causa_core::errors::{format_vertex_set, GraphError, IdentificationError};
use causa_core::identification_span;
use causa_graphs::{Graph, VertexSet};
use tracing::{debug, info};

use crate::factor::{district_factor, intervened_ancestors, marginalized_product, validate_query};
use crate::functional::{Functional, Kernel};

/// How a district of `G[Y*]` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictSource {
    pub experiment: VertexSet,
    pub fixing_order: Vec<String>,
}

/// Generalized one-line ID for a treatment/outcome query.
#[derive(Debug, Clone)]
pub struct OneLineGid {
    graph: Arc<Graph>,
    treatments: VertexSet,
    outcomes: VertexSet,
    ystar: VertexSet,
    sources: Option<BTreeMap<VertexSet, DistrictSource>>,
}

impl OneLineGid {
    pub fn new<I, J, S, T>(graph: &Graph, treatments: I, outcomes: J) -> Result<Self, IdentificationError>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let (treatments, outcomes) = validate_query(graph, treatments, outcomes)?;
        let ystar = intervened_ancestors(graph, &treatments, &outcomes)?;
        Ok(Self {
            graph: Arc::new(graph.clone()),
            treatments,
            outcomes,
            ystar,
            sources: None,
        })
    }

    /// Query on the latent projection of `graph` with `hidden` marginalized.
    pub fn from_hidden<H, I, J, R, S, T>(
        graph: &Graph,
        hidden: H,
        treatments: I,
        outcomes: J,
    ) -> Result<Self, IdentificationError>
    where
        H: IntoIterator<Item = R>,
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        R: AsRef<str>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let hidden: VertexSet = hidden.into_iter().map(|v| v.as_ref().to_string()).collect();
        for name in &hidden {
            if !graph.contains(name) {
                return Err(GraphError::UnknownVertex { name: name.clone() }.into());
            }
        }
        let observed: VertexSet = graph.vertex_names().difference(&hidden).cloned().collect();
        let projection = graph.latent_projection(&observed)?;
        Self::new(&projection, treatments, outcomes)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn ystar(&self) -> &VertexSet {
        &self.ystar
    }

    /// The experiment and fixing order used for each district, once
    /// [`Self::id`] succeeded.
    pub fn sources(&self) -> Option<&BTreeMap<VertexSet, DistrictSource>> {
        self.sources.as_ref()
    }

    /// Run the identification against `experiments`, tried in the order
    /// given for every district.
    pub fn id<I, E, S>(&mut self, experiments: I) -> Result<(), IdentificationError>
    where
        I: IntoIterator<Item = E>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _span = identification_span!("gid", self.treatments, self.outcomes).entered();
        self.sources = None;
        let experiments: Vec<VertexSet> = experiments
            .into_iter()
            .map(|e| e.into_iter().map(|v| v.as_ref().to_string()).collect())
            .collect();

        let mut sources = BTreeMap::new();
        for district in self.graph.subgraph(&self.ystar).districts() {
            let Some(source) = self.reach(&district, &experiments)? else {
                return Err(IdentificationError::NotIdentified {
                    district: format_vertex_set(&district),
                    reason: format!("not reachable from any of {} experiments", experiments.len()),
                });
            };
            debug!(district = ?district, experiment = ?source.experiment, "district reached");
            sources.insert(district, source);
        }
        info!(districts = sources.len(), "query identified");
        self.sources = Some(sources);
        Ok(())
    }

    fn reach(
        &self,
        district: &VertexSet,
        experiments: &[VertexSet],
    ) -> Result<Option<DistrictSource>, IdentificationError> {
        for experiment in experiments {
            if !experiment.is_disjoint(district) {
                continue;
            }
            let mut cadmg = (*self.graph).clone();
            cadmg.fix(experiment)?;
            let rest: VertexSet = cadmg.random_vertices().difference(district).cloned().collect();
            let (fixable, fixing_order) = cadmg.fixable(&rest);
            if fixable {
                return Ok(Some(DistrictSource {
                    experiment: experiment.clone(),
                    fixing_order,
                }));
            }
        }
        Ok(None)
    }

    /// `Σ_{Y* \ Y} Π_D q_D`, each kernel taken from the experiment that
    /// reaches its district and computed in the ancestral subgraph of the
    /// district. Vertices a kernel leaves unbound are averaged over their
    /// observed marginal.
    pub fn functional(&self) -> Result<Functional, IdentificationError> {
        let sources = self.sources.as_ref().ok_or(IdentificationError::State {
            operation: "functional",
            requires: "id",
        })?;
        let topological = self.graph.topological_sort()?;
        let mut factors = Vec::with_capacity(sources.len());
        for (district, source) in sources {
            if source.experiment.is_empty() {
                factors.push(district_factor(&self.graph, district, &topological)?);
            } else {
                factors.push(experimental_factor(&self.graph, district, source)?);
            }
        }
        let mut bound = self.ystar.clone();
        bound.extend(self.treatments.iter().cloned());
        let (product, unbound) = marginalized_product(factors, &bound);

        let mut over: VertexSet = self.ystar.difference(&self.outcomes).cloned().collect();
        over.extend(unbound);
        Ok(Functional::sum(over, product))
    }
}

/// Kernel of `district` under `p(V | do(E))`, restricted to the ancestors of
/// the district once `E` is fixed. Falls back to the whole CADMG and the
/// recorded order when the ancestral subgraph cannot reach the district.
fn experimental_factor(
    graph: &Graph,
    district: &VertexSet,
    source: &DistrictSource,
) -> Result<Functional, IdentificationError> {
    let mut cadmg = graph.clone();
    cadmg.fix(&source.experiment)?;
    let ancestral = cadmg.subgraph(cadmg.ancestors(district));
    let outside: VertexSet = ancestral.random_vertices().difference(district).cloned().collect();
    let (fixable, fixing_order) = ancestral.fixable(&outside);
    let (graph, fixing_order) = if fixable {
        (ancestral, fixing_order)
    } else {
        (cadmg, source.fixing_order.clone())
    };
    Ok(Functional::Kernel(Kernel {
        district: district.clone(),
        fixing_order,
        experiment: source.experiment.clone(),
        graph: Arc::new(graph),
    }))
}
