//! Building blocks shared by the identification algorithms: query
//! validation and the factor contributed by one district.

use std::sync::Arc;

use causa_core::errors::{format_vertex_set, GraphError, IdentificationError};
use causa_graphs::{Graph, VertexSet};

use crate::functional::{Functional, Kernel};

/// Collect and check a treatment/outcome query against `graph`.
pub(crate) fn validate_query<I, J, S, T>(
    graph: &Graph,
    treatments: I,
    outcomes: J,
) -> Result<(VertexSet, VertexSet), IdentificationError>
where
    I: IntoIterator<Item = S>,
    J: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let collect = |names: Vec<String>| -> Result<VertexSet, IdentificationError> {
        names
            .into_iter()
            .map(|name| {
                if graph.contains(&name) {
                    Ok(name)
                } else {
                    Err(GraphError::UnknownVertex { name }.into())
                }
            })
            .collect()
    };
    let treatments = collect(treatments.into_iter().map(|v| v.as_ref().to_string()).collect())?;
    let outcomes = collect(outcomes.into_iter().map(|v| v.as_ref().to_string()).collect())?;
    if outcomes.is_empty() {
        return Err(IdentificationError::InvalidQuery {
            reason: "no outcomes given".into(),
        });
    }
    let overlap: VertexSet = treatments.intersection(&outcomes).cloned().collect();
    if !overlap.is_empty() {
        return Err(IdentificationError::InvalidQuery {
            reason: format!(
                "{} are both treatments and outcomes",
                format_vertex_set(&overlap)
            ),
        });
    }
    Ok((treatments, outcomes))
}

/// Random ancestors of `outcomes` once `treatments` are fixed.
pub(crate) fn intervened_ancestors(
    graph: &Graph,
    treatments: &VertexSet,
    outcomes: &VertexSet,
) -> Result<VertexSet, IdentificationError> {
    let mut swig = graph.clone();
    swig.fix(treatments)?;
    Ok(swig
        .ancestors(outcomes)
        .into_iter()
        .filter(|v| !swig.is_fixed(v))
        .collect())
}

/// The factor `q_D` of an intrinsic district `D` of `graph`.
///
/// When `D` is a district of its own ancestral subgraph the kernel
/// factorizes as `Π_{d ∈ D} p(d | mp(d))` under `order`. Otherwise it is a
/// fixing kernel computed inside the ancestral subgraph, so its free
/// vertices stay among the ancestors of `D`.
pub(crate) fn district_factor(
    graph: &Graph,
    district: &VertexSet,
    order: &[String],
) -> Result<Functional, IdentificationError> {
    let ancestral = graph.subgraph(graph.ancestors(district));
    let first = district.iter().next();
    if first.is_some_and(|d| ancestral.district(d) == *district) {
        let factors = order
            .iter()
            .filter(|v| district.contains(*v))
            .map(|d| Functional::prob([d], ancestral.markov_pillow([d], order)));
        return Ok(Functional::product(factors));
    }

    let outside: VertexSet = ancestral
        .random_vertices()
        .difference(district)
        .cloned()
        .collect();
    let (fixable, fixing_order) = ancestral.fixable(&outside);
    if !fixable {
        return Err(IdentificationError::NotIdentified {
            district: format_vertex_set(district),
            reason: "not reachable in its ancestral subgraph".into(),
        });
    }
    Ok(Functional::Kernel(Kernel {
        district: district.clone(),
        fixing_order,
        experiment: VertexSet::new(),
        graph: Arc::new(ancestral),
    }))
}

/// Vertices a kernel leaves free that no enclosing sum or query binds.
fn unbound_kernel_vertices(factors: &[Functional], bound: &VertexSet) -> VertexSet {
    factors
        .iter()
        .filter_map(|factor| match factor {
            Functional::Kernel(kernel) => Some(kernel.graph.random_vertices()),
            _ => None,
        })
        .flatten()
        .filter(|v| !bound.contains(v))
        .collect()
}

/// Product of district factors, led by the observed marginal of the
/// vertices their kernels leave unbound. The caller sums those out.
pub(crate) fn marginalized_product(
    factors: Vec<Functional>,
    bound: &VertexSet,
) -> (Functional, VertexSet) {
    let unbound = unbound_kernel_vertices(&factors, bound);
    let mut product = factors;
    if !unbound.is_empty() {
        product.insert(0, Functional::prob(&unbound, VertexSet::new()));
    }
    (Functional::product(product), unbound)
}
