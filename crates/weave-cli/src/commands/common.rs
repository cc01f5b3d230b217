use crate::error::{CliError, Result};
use sseweave::core::io::pdb::PdbFile;
use sseweave::core::io::source::read_structure;
use sseweave::core::io::traits::StructureFile;
use sseweave::core::models::structure::Structure;
use sseweave::engine::services::command::ToolCommand;
use sseweave::engine::validation::AssemblyResult;
use sseweave::workflows::build::RunReport;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn read_input(path: &Path) -> Result<Structure> {
    info!("Loading structure from {:?}", path);
    read_structure(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

pub fn read_optional(path: Option<&Path>) -> Result<Option<Structure>> {
    path.map(read_input).transpose()
}

pub fn require_tool(tool: Option<&ToolCommand>, key: &str) -> Result<ToolCommand> {
    tool.cloned().ok_or_else(|| {
        CliError::Config(format!(
            "No `{}` command configured. Add it to the [tools] table of the config file.",
            key
        ))
    })
}

pub fn output_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("output_{}.pdb", index))
}

/// Writes every assembly as `output_<k>.pdb`, numbered from zero in result order.
pub fn write_assemblies(results: &[AssemblyResult], output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let path = output_path(output_dir, i);
            info!(
                topology = %result.topology,
                loops = ?result.loop_labels,
                "Writing assembly {} to {:?}",
                i,
                &path
            );
            PdbFile::write_structure_to_path(&result.structure, &path).map_err(|e| {
                CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                }
            })?;
            Ok(path)
        })
        .collect()
}

pub fn finish(report: &RunReport, output_dir: &Path) -> Result<()> {
    let summary = &report.summary;
    info!(
        searches = summary.search_calls,
        empty = summary.empty_searches,
        pruned = summary.pruned_branches,
        duplicates = summary.duplicates_skipped,
        topologies = summary.loops.topologies_valid,
        loop_searches = summary.loops.loop_search_calls,
        loop_search_failures = summary.loops.loop_search_failures,
        "Run summary"
    );

    if report.results.is_empty() {
        warn!("Workflow completed but produced no assemblies.");
        println!("Warning: no assembly passed validation.");
        return Ok(());
    }

    println!(
        "Workflow complete. Writing {} assembl{}...",
        report.results.len(),
        if report.results.len() == 1 { "y" } else { "ies" }
    );
    let paths = write_assemblies(&report.results, output_dir)?;
    for (result, path) in report.results.iter().zip(&paths) {
        println!(
            "  {} ({}) written to: {}",
            result.fragment_names.join(" - "),
            result.topology,
            path.display()
        );
    }
    Ok(())
}
