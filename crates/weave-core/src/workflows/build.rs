use crate::core::models::fragment::Fragment;
use crate::core::models::structure::Structure;
use crate::engine::config::{AssemblyConfig, ConfigError};
use crate::engine::error::EngineError;
use crate::engine::orchestrator::{AssemblyState, Collaborators, Orchestrator, RunSummary};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::validation::AssemblyResult;
use std::sync::Arc;
use tracing::{info, instrument};

/// The structures a design run starts from.
#[derive(Debug, Clone)]
pub struct DesignInputs {
    seed: Option<Arc<Structure>>,
    query: Option<Arc<Structure>>,
    exclusion: Option<Arc<Structure>>,
}

impl DesignInputs {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingInput`] if neither a seed nor a query is given.
    pub fn new(
        seed: Option<Structure>,
        query: Option<Structure>,
        exclusion: Option<Structure>,
    ) -> Result<Self, ConfigError> {
        if seed.is_none() && query.is_none() {
            return Err(ConfigError::MissingInput("a seed or query structure"));
        }
        Ok(Self {
            seed: seed.map(Arc::new),
            query: query.map(Arc::new),
            exclusion: exclusion.map(Arc::new),
        })
    }

    pub fn seed(&self) -> Option<&Structure> {
        self.seed.as_deref()
    }

    pub fn query(&self) -> Option<&Structure> {
        self.query.as_deref()
    }

    pub fn exclusion(&self) -> Option<&Structure> {
        self.exclusion.as_deref()
    }
}

/// Results of a workflow together with the counters of the run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<AssemblyResult>,
    pub summary: RunSummary,
}

/// One fragment per chain of `structure`, named `<prefix>_<chain id>`.
pub(crate) fn chain_fragments(structure: &Structure, prefix: &str) -> Vec<Fragment> {
    structure
        .split_chains()
        .into_iter()
        .map(|part| {
            let id = part.chains_iter().next().map(|(_, c)| c.id).unwrap_or('?');
            Fragment::new(format!("{}_{}", prefix, id), part)
        })
        .collect()
}

fn initial_state(inputs: &DesignInputs) -> AssemblyState {
    let fragments = inputs
        .seed()
        .map(|seed| chain_fragments(seed, "seed"))
        .unwrap_or_default();
    let query_fragments = inputs
        .query()
        .map(|query| chain_fragments(query, "query"))
        .unwrap_or_default();

    let search_query: Arc<Structure> = match (&inputs.query, &inputs.seed) {
        (Some(query), Some(seed)) => Arc::new(Structure::merge(&[&**query, &**seed])),
        (None, Some(seed)) => Arc::clone(seed),
        (Some(query), None) => Arc::clone(query),
        (None, None) => Arc::new(Structure::new()),
    };
    let exclusion = match inputs.exclusion() {
        Some(external) => Arc::new(Structure::merge(&[&*search_query, external])),
        None => Arc::clone(&search_query),
    };

    AssemblyState {
        fragments,
        query_fragments,
        search_query,
        exclusion,
    }
}

/// Grows the seed (or query) fragment by fragment and closes every complete fragment
/// set with loops.
///
/// # Errors
///
/// Returns [`EngineError`] only for inconsistencies; failed or empty searches simply
/// yield fewer results.
#[instrument(skip_all, name = "build_workflow")]
pub fn run(
    inputs: &DesignInputs,
    config: &AssemblyConfig,
    collaborators: Collaborators<'_>,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let initial = initial_state(inputs);
    info!(
        seed_fragments = initial.fragments.len(),
        query_fragments = initial.query_fragments.len(),
        iterations = config.num_iterations,
        "Starting assembly."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Assembly" });
    let mut orchestrator = Orchestrator::new(config, collaborators, inputs.exclusion(), reporter);
    let (results, summary) = orchestrator.run(initial)?;
    reporter.report(Progress::PhaseFinish);

    info!(
        searches = summary.search_calls,
        pruned = summary.pruned_branches,
        duplicates = summary.duplicates_skipped,
        loop_assemblies = summary.loop_assemblies,
        topologies = summary.loops.topologies_valid,
        "Workflow complete. Returning {} assembl{}.",
        results.len(),
        if results.len() == 1 { "y" } else { "ies" }
    );
    Ok(RunReport { results, summary })
}
