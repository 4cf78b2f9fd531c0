//! Test fixture loader for causa golden graphs and seeded simulated datasets.
//!
//! Provides typed deserialization of the fixture JSON files and helper
//! functions for loading them in tests across crates.

pub mod simulate;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root directory of the test-fixtures folder.
fn fixtures_root() -> PathBuf {
    // Works from any crate in the workspace: walk up to find test-fixtures.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);

    while !path.join("test-fixtures").exists() {
        if !path.pop() {
            panic!(
                "Could not find test-fixtures directory from CARGO_MANIFEST_DIR={}",
                manifest_dir
            );
        }
    }
    path.join("test-fixtures")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Load a fixture file as raw JSON Value.
pub fn load_fixture_value(relative_path: &str) -> serde_json::Value {
    load_fixture(relative_path)
}

/// Check that a fixture file exists.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// List all JSON files in a fixture subdirectory, sorted.
pub fn list_fixtures(subdir: &str) -> Vec<PathBuf> {
    let dir = fixtures_root().join(subdir);
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("Failed to read directory {}: {}", dir.display(), e))
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

/// A golden graph: structure plus the answers expected from the graph
/// algorithms. Expected values absent from a file are not checked.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphFixture {
    pub name: String,
    pub kind: String,
    pub vertices: Vec<String>,
    #[serde(default)]
    pub di_edges: Vec<(String, String)>,
    #[serde(default)]
    pub bi_edges: Vec<(String, String)>,
    #[serde(default)]
    pub ud_edges: Vec<(String, String)>,
    #[serde(default)]
    pub expected: GraphExpectations,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphExpectations {
    pub districts: Option<Vec<Vec<String>>>,
    pub topological_order: Option<Vec<String>>,
    pub intrinsic_sets: Option<Vec<Vec<String>>>,
    pub arid_di_edges: Option<Vec<(String, String)>>,
    pub arid_bi_edges: Option<Vec<(String, String)>>,
    pub nonparametric_saturated: Option<bool>,
    /// Vertex set (joined with `,`) to its Markov blanket.
    pub markov_blankets: Option<BTreeMap<String, Vec<String>>>,
}

impl GraphFixture {
    pub fn vertex_refs(&self) -> Vec<&str> {
        self.vertices.iter().map(String::as_str).collect()
    }

    pub fn edge_refs(edges: &[(String, String)]) -> Vec<(&str, &str)> {
        edges.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect()
    }
}

/// Load every golden graph under `golden/graphs`.
pub fn golden_graphs() -> Vec<GraphFixture> {
    list_fixtures("golden/graphs")
        .iter()
        .map(|path| {
            let relative = format!(
                "golden/graphs/{}",
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
            );
            load_fixture(&relative)
        })
        .collect()
}
