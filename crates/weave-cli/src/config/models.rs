use sseweave::engine::config::AssemblyConfig;
use sseweave::engine::services::command::ToolCommand;
use std::path::PathBuf;

/// External programs and the directory their per-call inputs and outputs go to.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub fragment_search: Option<ToolCommand>,
    pub loop_search: Option<ToolCommand>,
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub core_config: AssemblyConfig,
    pub tools: ToolsConfig,
    pub cluster_cutoff: f64,
}
