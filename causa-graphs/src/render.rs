//! Graphviz DOT rendering.
//!
//! Fixed vertices are squares and random vertices plain text. Directed
//! edges are blue, bidirected red and undirected brown; edges into a proxy
//! are grey.

use causa_core::config::{ExportConfig, RankDirection};

use crate::graph::Graph;
use crate::kind::EdgeType;
use crate::vertex::VertexRole;

/// Rendering options.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub rank_direction: RankDirection,
    /// Edges drawn invisibly, used to keep related vertices adjacent.
    pub invisible_edges: Vec<(String, String)>,
}

impl RenderOptions {
    pub fn left_right() -> Self {
        Self {
            rank_direction: RankDirection::LeftRight,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            rank_direction: config.rank_direction,
            ..Self::default()
        }
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

impl Graph {
    /// Render as a DOT digraph.
    pub fn to_dot(&self, options: &RenderOptions) -> String {
        let mut dot = String::from("digraph G {\n");
        if options.rank_direction == RankDirection::LeftRight {
            dot.push_str("    rankdir=LR;\n");
        }
        for vertex in self.vertices() {
            let shape = if vertex.fixed { "square" } else { "plaintext" };
            dot.push_str(&format!(
                "    {} [shape={shape}, height=.5, width=.5];\n",
                quote(&vertex.name)
            ));
        }
        for edge in self.edges() {
            let style = match edge.edge {
                EdgeType::Directed if self.role(&edge.to) == Some(VertexRole::Proxy) => {
                    "color=grey"
                }
                EdgeType::Directed => "color=blue",
                EdgeType::Bidirected => "dir=both, color=red",
                EdgeType::Undirected => "dir=none, color=brown",
            };
            dot.push_str(&format!(
                "    {} -> {} [{style}];\n",
                quote(&edge.from),
                quote(&edge.to)
            ));
        }
        for (from, to) in &options.invisible_edges {
            dot.push_str(&format!("    {} -> {} [style=invis];\n", quote(from), quote(to)));
        }
        dot.push_str("}\n");
        dot
    }
}
