//! Export of the intermediate CADMGs visited while fixing.
//!
//! For every district of `G[Y*]` the graph is fixed one vertex at a time
//! along the recorded order, and each intermediate CADMG is written as
//! `phi<fixed so far>_dis<district>.gv`. A manifest describing the query
//! and every file is written next to them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use causa_core::config::ExportConfig;
use causa_core::constants::INTERMEDIATES_MANIFEST;
use causa_core::errors::{CausaError, CausaResult, IdentificationError};
use causa_graphs::RenderOptions;

use crate::OneLineId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub treatments: Vec<String>,
    pub outcomes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictRecord {
    pub district: Vec<String>,
    pub fixing_order: Vec<String>,
    pub files: Vec<String>,
}

/// Contents of `intermediates.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediatesManifest {
    pub query: QueryRecord,
    pub districts: Vec<DistrictRecord>,
}

/// Names run together, e.g. `BDY`.
fn concat(vertices: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    vertices.into_iter().map(|v| v.as_ref().to_string()).collect()
}

/// Whether `name` is a file an earlier export wrote.
fn is_previous_export(name: &str) -> bool {
    name == INTERMEDIATES_MANIFEST || (name.starts_with("phi") && name.ends_with(".gv"))
}

impl OneLineId {
    /// Export into `config.intermediates_dir` with its rank direction.
    pub fn export_intermediates_with(&self, config: &ExportConfig) -> CausaResult<IntermediatesManifest> {
        self.export_intermediates(&config.intermediates_dir, &RenderOptions::from_config(config))
    }

    /// Write every intermediate CADMG and the manifest into `folder`,
    /// creating it if needed and replacing the files of an earlier export.
    pub fn export_intermediates(
        &self,
        folder: impl AsRef<Path>,
        options: &RenderOptions,
    ) -> CausaResult<IntermediatesManifest> {
        let orders = self.fixing_orders().ok_or(IdentificationError::State {
            operation: "export_intermediates",
            requires: "id",
        })?;
        let folder = folder.as_ref();
        let folder_name = folder.display().to_string();
        fs::create_dir_all(folder).map_err(|e| CausaError::io(&folder_name, e))?;

        for entry in fs::read_dir(folder).map_err(|e| CausaError::io(&folder_name, e))? {
            let path = entry.map_err(|e| CausaError::io(&folder_name, e))?.path();
            let stale = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(is_previous_export);
            if stale {
                fs::remove_file(&path).map_err(|e| CausaError::io(path.display().to_string(), e))?;
            }
        }

        let mut districts = Vec::with_capacity(orders.len());
        for (district, order) in orders {
            let mut cadmg = self.graph().clone();
            let mut fixed = String::new();
            let mut files = Vec::with_capacity(order.len());
            for vertex in order {
                cadmg.fix([vertex])?;
                fixed.push_str(vertex);
                let file = format!("phi{fixed}_dis{}.gv", concat(district));
                let path = folder.join(&file);
                fs::write(&path, cadmg.to_dot(options))
                    .map_err(|e| CausaError::io(path.display().to_string(), e))?;
                debug!(file = %file, "wrote intermediate CADMG");
                files.push(file);
            }
            districts.push(DistrictRecord {
                district: district.iter().cloned().collect(),
                fixing_order: order.clone(),
                files,
            });
        }

        let manifest = IntermediatesManifest {
            query: QueryRecord {
                treatments: self.treatments().iter().cloned().collect(),
                outcomes: self.outcomes().iter().cloned().collect(),
            },
            districts,
        };
        let path = folder.join(INTERMEDIATES_MANIFEST);
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)
            .map_err(|e| CausaError::io(path.display().to_string(), e))?;
        info!(folder = %folder.display(), districts = manifest.districts.len(), "exported intermediates");
        Ok(manifest)
    }
}
