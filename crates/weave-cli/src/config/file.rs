use crate::error::{CliError, Result};
use serde::Deserialize;
use sseweave::engine::config::{Breadth, PruneRule, RepresentativePolicy};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAssemblyConfig {
    pub iterations: Option<usize>,
    pub max_nc_dist: Option<f64>,
    pub adjacency_threshold: Option<f64>,
    pub candidate_breadth: Option<Breadth>,
    pub seed_group_breadth: Option<Breadth>,
    pub prune_rule: Option<PruneRule>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileFragmentSearchConfig {
    pub rmsd_cutoff: Option<f64>,
    pub window: Option<usize>,
    pub window_rmsd: Option<f64>,
    pub top: Option<usize>,
    pub secondary_structure: Option<String>,
    pub min_neighbors: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLoopConfig {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub rmsd_cutoff: Option<f64>,
    pub top: Option<usize>,
    pub overlap_window: Option<f64>,
    pub key_residue_fraction: Option<f64>,
    pub clusters_per_length: Option<usize>,
    pub representative: Option<RepresentativePolicy>,
    pub cluster_cutoff: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScreeningConfig {
    pub clash_distance: Option<f64>,
    pub stitch_min_separation: Option<usize>,
    pub max_ca_gap: Option<f64>,
    pub compactness: Option<bool>,
    pub pre_loop_min: Option<f64>,
    pub final_min: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileToolsConfig {
    pub fragment_search: Option<Vec<String>>,
    pub loop_search: Option<Vec<String>>,
    pub work_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub assembly: Option<FileAssemblyConfig>,
    pub fragment_search: Option<FileFragmentSearchConfig>,
    pub loops: Option<FileLoopConfig>,
    pub screening: Option<FileScreeningConfig>,
    pub tools: Option<FileToolsConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
