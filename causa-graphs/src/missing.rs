//! Missing-data ADMGs.
//!
//! Naming convention: `X_i` is the counterfactual variable, `R_i` its
//! missingness indicator and `Xp_i` the observed proxy. Vertex roles follow
//! from the names, so any graph using the convention can be queried.

use causa_core::constants::{COUNTERFACTUAL_PREFIX, INDICATOR_PREFIX, PROXY_PREFIX};
use causa_core::errors::GraphError;

use crate::graph::{Graph, VertexSet};
use crate::kind::GraphKind;
use crate::vertex::{Vertex, VertexRole};

/// Role implied by a vertex name.
pub fn role_of(name: &str) -> VertexRole {
    if name.starts_with(PROXY_PREFIX) {
        VertexRole::Proxy
    } else if name.starts_with(COUNTERFACTUAL_PREFIX) {
        VertexRole::Counterfactual
    } else if name.starts_with(INDICATOR_PREFIX) {
        VertexRole::MissingnessIndicator
    } else {
        VertexRole::Random
    }
}

/// The variable suffix `i` of `X_i`, `R_i` or `Xp_i`.
fn suffix(name: &str) -> Option<&str> {
    name.strip_prefix(PROXY_PREFIX)
        .or_else(|| name.strip_prefix(COUNTERFACTUAL_PREFIX))
        .or_else(|| name.strip_prefix(INDICATOR_PREFIX))
}

/// `Xp_i` for a counterfactual name `X_i`.
pub fn proxy_name(counterfactual: &str) -> Option<String> {
    if role_of(counterfactual) != VertexRole::Counterfactual {
        return None;
    }
    suffix(counterfactual).map(|i| format!("{PROXY_PREFIX}{i}"))
}

fn effective_role(vertex: &Vertex) -> VertexRole {
    match vertex.role {
        VertexRole::Random => role_of(&vertex.name),
        role => role,
    }
}

impl Graph {
    /// Build a missing-data ADMG. Roles are assigned from the names, and
    /// `X_i -> Xp_i`, `R_i -> Xp_i` are added for every proxy present.
    /// A proxy without both its counterfactual and its indicator is a
    /// `StructuralInvariant` error.
    pub fn missing_admg(
        vertices: &[&str],
        di_edges: &[(&str, &str)],
        bi_edges: &[(&str, &str)],
    ) -> Result<Self, GraphError> {
        let mut graph = Graph::new(GraphKind::MissingAdmg);
        for name in vertices {
            graph.add_vertex_with(Vertex::new(*name).with_role(role_of(name)))?;
        }
        for (a, b) in di_edges {
            graph.add_diedge(a, b)?;
        }
        for (a, b) in bi_edges {
            graph.add_biedge(a, b)?;
        }
        for proxy in graph.proxies() {
            if graph.counterfactual_of(&proxy).is_none() || graph.indicator_of(&proxy).is_none() {
                return Err(GraphError::StructuralInvariant {
                    reason: format!("proxy {proxy} needs both its counterfactual and its indicator"),
                });
            }
        }
        for counterfactual in graph.counterfactuals() {
            let (Some(proxy), Some(indicator)) = (
                graph.proxy_of(&counterfactual),
                graph.indicator_of(&counterfactual),
            ) else {
                continue;
            };
            graph.add_diedge(&counterfactual, &proxy)?;
            graph.add_diedge(&indicator, &proxy)?;
        }
        Ok(graph)
    }

    fn vertices_with_role(&self, role: VertexRole) -> VertexSet {
        self.vertices()
            .filter(|v| effective_role(v) == role)
            .map(|v| v.name.clone())
            .collect()
    }

    /// Missingness indicators `R_i`.
    pub fn indicators(&self) -> VertexSet {
        self.vertices_with_role(VertexRole::MissingnessIndicator)
    }

    /// Counterfactuals `X_i`.
    pub fn counterfactuals(&self) -> VertexSet {
        self.vertices_with_role(VertexRole::Counterfactual)
    }

    /// Proxies `Xp_i`.
    pub fn proxies(&self) -> VertexSet {
        self.vertices_with_role(VertexRole::Proxy)
    }

    pub fn role(&self, vertex: &str) -> Option<VertexRole> {
        self.vertex(vertex).map(effective_role)
    }

    fn sibling_name(&self, vertex: &str, prefix: &str) -> Option<String> {
        let name = format!("{prefix}{}", suffix(vertex)?);
        self.contains(&name).then_some(name)
    }

    /// `X_i` for `R_i` (or `Xp_i`), when present in the graph.
    pub fn counterfactual_of(&self, vertex: &str) -> Option<String> {
        self.sibling_name(vertex, COUNTERFACTUAL_PREFIX)
    }

    /// `R_i` for `X_i` (or `Xp_i`), when present in the graph.
    pub fn indicator_of(&self, vertex: &str) -> Option<String> {
        self.sibling_name(vertex, INDICATOR_PREFIX)
    }

    /// `Xp_i` for `X_i` (or `R_i`), when present in the graph.
    pub fn proxy_of(&self, vertex: &str) -> Option<String> {
        self.sibling_name(vertex, PROXY_PREFIX)
    }

    /// Column carrying `vertex` in the observed data: `Xp_i` for a
    /// counterfactual `X_i` that has an indicator, the name itself otherwise.
    pub fn observed_name(&self, vertex: &str) -> String {
        let counterfactual = self.role(vertex) == Some(VertexRole::Counterfactual);
        match proxy_name(vertex) {
            Some(proxy) if counterfactual && self.indicator_of(vertex).is_some() => proxy,
            _ => vertex.to_string(),
        }
    }

    /// The graph as the observed data sees it: proxies are dropped and every
    /// counterfactual with an indicator is renamed to its proxy, keeping its
    /// edges and fixed flag.
    pub fn proxy_view(&self) -> Result<Graph, GraphError> {
        let is_proxy = |name: &str| self.role(name) == Some(VertexRole::Proxy);
        let mut view = Graph::new(self.kind());
        for vertex in self.vertices().filter(|v| effective_role(v) != VertexRole::Proxy) {
            let observed = self.observed_name(&vertex.name);
            let mut vertex = vertex.clone();
            if observed != vertex.name {
                vertex.name = observed;
                vertex.role = VertexRole::Proxy;
            }
            view.add_vertex_with(vertex)?;
        }
        for edge in self.edges() {
            if is_proxy(&edge.from) || is_proxy(&edge.to) {
                continue;
            }
            view.insert_edge_by_name(
                edge.edge,
                &self.observed_name(&edge.from),
                &self.observed_name(&edge.to),
            )?;
        }
        Ok(view)
    }
}
