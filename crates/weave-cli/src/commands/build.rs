use super::common;
use crate::cli::BuildArgs;
use crate::config::builder::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use sseweave::engine::orchestrator::Collaborators;
use sseweave::engine::progress::ProgressReporter;
use sseweave::engine::services::clustering::LeaderClusterer;
use sseweave::engine::services::command::{CommandFragmentSearch, CommandLoopSearch};
use sseweave::engine::validation::GeometricScreen;
use sseweave::workflows::build::{self, DesignInputs};
use tracing::info;

pub fn run(args: BuildArgs, progress: &CliProgressHandler) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_config(&args.overrides, &args.output_dir)?;

    let inputs = DesignInputs::new(
        common::read_optional(args.seed.as_deref())?,
        common::read_optional(args.query.as_deref())?,
        common::read_optional(args.exclusion.as_deref())?,
    )
    .map_err(|e| CliError::Config(e.to_string()))?;

    let fragment_tool =
        common::require_tool(app.tools.fragment_search.as_ref(), "fragment-search")?;
    let loop_tool = common::require_tool(app.tools.loop_search.as_ref(), "loop-search")?;
    std::fs::create_dir_all(&app.tools.work_dir)?;

    let mut fragment_search =
        CommandFragmentSearch::new(fragment_tool, app.tools.work_dir.join("fragments"));
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
    println!("Starting assembly...");
    info!("Invoking the build workflow...");
    let report = build::run(&inputs, &app.core_config, collaborators, &reporter)?;

    progress.show_summary(&report.summary);
    common::finish(&report, &args.output_dir)
}
