//! Markov blankets and pillows.

use crate::graph::{Graph, VertexSet};

impl Graph {
    /// Markov blanket of a set: its districts and their parents, minus the set.
    pub fn markov_blanket<S: AsRef<str>>(&self, vertices: impl IntoIterator<Item = S>) -> VertexSet {
        let set: VertexSet = vertices.into_iter().map(|v| v.as_ref().to_string()).collect();
        let district = self.districts_of(&set);
        let mut blanket = self.parents(&district);
        blanket.extend(district);
        blanket.retain(|v| !set.contains(v));
        blanket
    }

    /// Markov pillow of a set under `order`: the Markov blanket computed in
    /// the subgraph of the set and everything preceding it.
    pub fn markov_pillow<S: AsRef<str>>(
        &self,
        vertices: impl IntoIterator<Item = S>,
        order: &[String],
    ) -> VertexSet {
        let set: VertexSet = vertices.into_iter().map(|v| v.as_ref().to_string()).collect();
        let mut keep = self.pre(&set, order);
        keep.extend(set.iter().cloned());
        self.subgraph(&keep).markov_blanket(&set)
    }
}
