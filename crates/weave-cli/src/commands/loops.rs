use super::common;
use crate::cli::LoopArgs;
use crate::config::builder::build_config;
use crate::error::{CliError, Result};
use crate::utils::parser;
use crate::utils::progress::CliProgressHandler;
use sseweave::engine::orchestrator::Collaborators;
use sseweave::engine::progress::ProgressReporter;
use sseweave::engine::search::{FragmentHit, FragmentQuery, FragmentSearch, SearchOutcome};
use sseweave::engine::services::clustering::LeaderClusterer;
use sseweave::engine::services::command::CommandLoopSearch;
use sseweave::engine::validation::GeometricScreen;
use sseweave::workflows::loop_seed::{self, LoopSeedOptions};
use std::collections::BTreeSet;
use tracing::info;

/// Stand-in for the fragment search, which looping a complete seed never calls.
struct NoFragmentSearch;

impl FragmentSearch for NoFragmentSearch {
    fn search(&mut self, _query: &FragmentQuery<'_>) -> SearchOutcome<FragmentHit> {
        SearchOutcome::failed("fragment search is not available when looping a seed")
    }
}

/// Parses the looping options for a seed with `chain_count` chains.
fn loop_options(args: &LoopArgs, chain_count: usize) -> Result<LoopSeedOptions> {
    let list = |value: &Option<String>| -> Result<Vec<usize>> {
        value
            .as_deref()
            .map(parser::parse_index_list)
            .transpose()
            .map(Option::unwrap_or_default)
            .map_err(|e| CliError::Argument(e.to_string()))
    };

    let mut chain_key_residues: Vec<BTreeSet<usize>> = Vec::new();
    for spec in &args.key_residues {
        let (chain, residues) =
            parser::parse_key_residues(spec).map_err(|e| CliError::Argument(e.to_string()))?;
        if chain >= chain_count {
            return Err(CliError::Argument(format!(
                "key residues given for chain {} but the seed has {} chain(s)",
                chain, chain_count
            )));
        }
        if chain_key_residues.len() <= chain {
            chain_key_residues.resize(chain + 1, BTreeSet::new());
        }
        chain_key_residues[chain].extend(residues);
    }

    Ok(LoopSeedOptions {
        n_truncations: list(&args.n_trim)?,
        c_truncations: list(&args.c_trim)?,
        chain_key_residues,
        order: args
            .order
            .as_deref()
            .map(parser::parse_index_list)
            .transpose()
            .map_err(|e| CliError::Argument(e.to_string()))?,
    })
}

pub fn run(args: LoopArgs, progress: &CliProgressHandler) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_config(&args.overrides, &args.output_dir)?;
    let seed = common::read_input(&args.seed)?;
    let options = loop_options(&args, seed.chain_count())?;
    let exclusion = common::read_optional(args.exclusion.as_deref())?;

    let loop_tool = common::require_tool(app.tools.loop_search.as_ref(), "loop-search")?;
    std::fs::create_dir_all(&app.tools.work_dir)?;

    let mut fragment_search = NoFragmentSearch;
    let mut loop_search = CommandLoopSearch::new(loop_tool, app.tools.work_dir.join("loops"));
    let mut clusterer = LeaderClusterer::new(app.cluster_cutoff);
    let screen = GeometricScreen::from_config(&app.core_config.screening);
    let collaborators = Collaborators {
        fragment_search: &mut fragment_search,
        loop_search: &mut loop_search,
        clusterer: &mut clusterer,
        screen: &screen,
    };

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    println!("Starting loop assembly...");
    info!("Invoking the loop seed workflow...");
    let report = loop_seed::run(
        &seed,
        exclusion.as_ref(),
        &options,
        &app.core_config,
        collaborators,
        &reporter,
    )?;

    progress.show_summary(&report.summary);
    common::finish(&report, &args.output_dir)
}
