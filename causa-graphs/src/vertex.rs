//! Vertex: a named variable with a role and a fixed flag.

use serde::{Deserialize, Serialize};

/// What a vertex stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexRole {
    /// An ordinary observed (or latent) variable.
    #[default]
    Random,
    /// `R_i`: whether the counterfactual `X_i` was observed.
    MissingnessIndicator,
    /// `X_i`: a variable as it would be without missingness.
    Counterfactual,
    /// `Xp_i`: the observed proxy of `X_i`.
    Proxy,
}

/// Number of levels a vertex takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Discrete(u32),
    Continuous,
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::Discrete(2)
    }
}

/// A vertex of a [`crate::Graph`]. Vertices are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub name: String,
    /// Fixed vertices are intervened on or conditioned away; they are
    /// drawn as squares and excluded from districts and blocks.
    pub fixed: bool,
    pub role: VertexRole,
    pub cardinality: Cardinality,
}

impl Vertex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed: false,
            role: VertexRole::Random,
            cardinality: Cardinality::default(),
        }
    }

    pub fn with_role(mut self, role: VertexRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}
