//! Single-world intervention graphs.
//!
//! Every treatment `A` is split in two: the random `A` keeps its incoming
//! edges, and a fixed copy `a` takes over its outgoing directed edges. The
//! pair is tied by an invisible edge when drawn so the two halves stay
//! side by side.

use causa_core::errors::IdentificationError;
use causa_graphs::{Graph, RenderOptions, Vertex, VertexSet};

/// A SWIG and the `(random, fixed copy)` pairs it split.
#[derive(Debug, Clone)]
pub struct Swig {
    pub graph: Graph,
    pub splits: Vec<(String, String)>,
}

impl Swig {
    pub fn new(graph: &Graph, treatments: &VertexSet) -> Result<Self, IdentificationError> {
        let mut swig = graph.clone();
        let mut splits = Vec::with_capacity(treatments.len());
        for treatment in treatments {
            let copy = fixed_copy_name(&swig, treatment);
            swig.add_vertex_with(Vertex::new(copy.clone()).fixed())?;
            for child in swig.children([treatment]) {
                swig.delete_diedge(treatment, &child)?;
                swig.add_diedge(&copy, &child)?;
            }
            splits.push((treatment.clone(), copy));
        }
        Ok(Self {
            graph: swig,
            splits,
        })
    }

    /// DOT rendering with the split pairs joined invisibly.
    pub fn to_dot(&self, options: &RenderOptions) -> String {
        let mut options = options.clone();
        options.invisible_edges.extend(self.splits.iter().cloned());
        self.graph.to_dot(&options)
    }
}

/// Lowercase name for the fixed copy, primed until it is unused.
fn fixed_copy_name(graph: &Graph, treatment: &str) -> String {
    let mut name = treatment.to_lowercase();
    while graph.contains(&name) {
        name.push('\'');
    }
    name
}

impl crate::OneLineId {
    pub fn swig(&self) -> Result<Swig, IdentificationError> {
        Swig::new(self.graph(), self.treatments())
    }

    /// DOT rendering of the SWIG of the query.
    pub fn draw_swig(&self, options: &RenderOptions) -> Result<String, IdentificationError> {
        Ok(self.swig()?.to_dot(options))
    }
}
