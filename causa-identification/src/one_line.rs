//! One-line identification of `p(Y(a))`.
//!
//! `Y*` is the set of random ancestors of the outcomes once the treatments
//! are fixed. The query is identified iff every district `D` of `G[Y*]` is
//! intrinsic in `G`, i.e. `V \ D` is fixable; the identifying functional is
//! then `Σ_{Y* \ Y} Π_D q_D`.

use std::collections::BTreeMap;
use std::sync::Arc;

use causa_core::errors::{format_vertex_set, IdentificationError};
use causa_core::identification_span;
use causa_graphs::{Graph, VertexSet};
use tracing::{debug, info};

use crate::factor::{district_factor, intervened_ancestors, marginalized_product, validate_query};
use crate::functional::Functional;

/// One-line ID for a treatment/outcome query on an ADMG.
#[derive(Debug, Clone)]
pub struct OneLineId {
    graph: Arc<Graph>,
    treatments: VertexSet,
    outcomes: VertexSet,
    ystar: VertexSet,
    fixing_orders: Option<BTreeMap<VertexSet, Vec<String>>>,
}

impl OneLineId {
    /// Set up the query. The graph is snapshotted; later changes to it are
    /// not seen.
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
            fixing_orders: None,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn treatments(&self) -> &VertexSet {
        &self.treatments
    }

    pub fn outcomes(&self) -> &VertexSet {
        &self.outcomes
    }

    /// Random ancestors of the outcomes in the intervened graph.
    pub fn ystar(&self) -> &VertexSet {
        &self.ystar
    }

    /// `G[Y*]`.
    pub fn ystar_graph(&self) -> Graph {
        self.graph.subgraph(&self.ystar)
    }

    /// Fixing order of each district of `G[Y*]`, once [`Self::id`] succeeded.
    pub fn fixing_orders(&self) -> Option<&BTreeMap<VertexSet, Vec<String>>> {
        self.fixing_orders.as_ref()
    }

    /// Run the identification. Fails with the first district of `G[Y*]`
    /// whose complement cannot be fixed.
    pub fn id(&mut self) -> Result<(), IdentificationError> {
        let _span = identification_span!("one_line", self.treatments, self.outcomes).entered();
        self.fixing_orders = None;

        let vertices = self.graph.random_vertices();
        let mut orders = BTreeMap::new();
        for district in self.ystar_graph().districts() {
            let rest: VertexSet = vertices.difference(&district).cloned().collect();
            let (fixable, order) = self.graph.fixable(&rest);
            if !fixable {
                let stuck: VertexSet = rest.iter().filter(|v| !order.contains(*v)).cloned().collect();
                debug!(district = ?district, stuck = ?stuck, "district is not intrinsic");
                return Err(IdentificationError::NotIdentified {
                    district: format_vertex_set(&district),
                    reason: format!("{} cannot be fixed", format_vertex_set(&stuck)),
                });
            }
            debug!(district = ?district, order = ?order, "district is intrinsic");
            orders.insert(district, order);
        }
        info!(districts = orders.len(), "query identified");
        self.fixing_orders = Some(orders);
        Ok(())
    }

    fn orders(&self, operation: &'static str) -> Result<&BTreeMap<VertexSet, Vec<String>>, IdentificationError> {
        self.fixing_orders
            .as_ref()
            .ok_or(IdentificationError::State {
                operation,
                requires: "id",
            })
    }

    /// `Π_D q_D` over the districts of `G[Y*]`, with any vertex a kernel
    /// leaves unbound averaged over its observed marginal.
    fn district_product(&self, operation: &'static str) -> Result<(Functional, VertexSet), IdentificationError> {
        let orders = self.orders(operation)?;
        let topological = self.graph.topological_sort()?;
        let factors = orders
            .keys()
            .map(|district| district_factor(&self.graph, district, &topological))
            .collect::<Result<Vec<_>, _>>()?;

        let mut bound = self.ystar.clone();
        bound.extend(self.treatments.iter().cloned());
        Ok(marginalized_product(factors, &bound))
    }

    /// The identifying functional of `p(Y(a))`: `Σ_{Y* \ Y} Π_D q_D`.
    pub fn functional(&self) -> Result<Functional, IdentificationError> {
        let (product, unbound) = self.district_product("functional")?;
        let mut over: VertexSet = self.ystar.difference(&self.outcomes).cloned().collect();
        over.extend(unbound);
        Ok(Functional::sum(over, product))
    }

    /// The functional of `E[Y(a)]` for one outcome, with every treatment
    /// bound to its value in `assignment`.
    pub fn mean_functional(
        &self,
        outcome: &str,
        assignment: &BTreeMap<String, f64>,
    ) -> Result<Functional, IdentificationError> {
        if !self.outcomes.contains(outcome) {
            return Err(IdentificationError::InvalidQuery {
                reason: format!("{outcome} is not an outcome of the query"),
            });
        }
        let assigned: VertexSet = assignment.keys().cloned().collect();
        if assigned != self.treatments {
            return Err(IdentificationError::InvalidQuery {
                reason: format!(
                    "assignment covers {} but the treatments are {}",
                    format_vertex_set(&assigned),
                    format_vertex_set(&self.treatments)
                ),
            });
        }

        let (product, unbound) = self.district_product("mean_functional")?;
        let mut over = self.ystar.clone();
        over.extend(unbound);
        let body = Functional::product([Functional::Value(outcome.to_string()), product]);
        Ok(assignment
            .iter()
            .rev()
            .fold(Functional::sum(over, body), |inner, (treatment, value)| {
                Functional::bind(treatment.clone(), *value, inner)
            }))
    }
}
