use super::build::{RunReport, chain_fragments};
use crate::core::models::fragment::Fragment;
use crate::core::models::structure::Structure;
use crate::engine::config::AssemblyConfig;
use crate::engine::error::EngineError;
use crate::engine::loops::{LoopAssembler, LoopAssemblyInput, LoopAssemblyStats};
use crate::engine::orchestrator::{Collaborators, RunSummary};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::termini::CompatibilityMatrix;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Per-chain adjustments for looping a complete seed.
///
/// Every list is indexed by chain; missing entries mean "no truncation" and "no key
/// residues". Truncations and key residues only affect the copies used for clash
/// tests, never the stitched output.
#[derive(Debug, Clone, Default)]
pub struct LoopSeedOptions {
    pub n_truncations: Vec<usize>,
    pub c_truncations: Vec<usize>,
    /// Residue indices kept in clash tests, counted from 0 at the first residue left
    /// after truncation.
    pub chain_key_residues: Vec<BTreeSet<usize>>,
    /// A fixed chain order; when absent every satisfied ordering is tried.
    pub order: Option<Vec<usize>>,
}

impl LoopSeedOptions {
    fn clash_body(&self, index: usize, fragment: &Fragment) -> Fragment {
        let n_trim = self.n_truncations.get(index).copied().unwrap_or(0);
        let c_trim = self.c_truncations.get(index).copied().unwrap_or(0);
        let key_residues = self
            .chain_key_residues
            .get(index)
            .cloned()
            .unwrap_or_default();
        let structure = if n_trim == 0 && c_trim == 0 {
            fragment.shared_structure()
        } else {
            Arc::new(fragment.structure().trimmed(n_trim, c_trim))
        };
        Fragment::new(fragment.name(), structure).with_key_residues(key_residues)
    }
}

/// Treats every chain of `seed` as a finished fragment and only builds the loops
/// between them.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTopology`] if `options.order` is not a permutation of
/// the seed's chains.
#[instrument(skip_all, name = "loop_seed_workflow")]
pub fn run(
    seed: &Structure,
    exclusion: Option<&Structure>,
    options: &LoopSeedOptions,
    config: &AssemblyConfig,
    collaborators: Collaborators<'_>,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let fragments = chain_fragments(seed, "seed");
    let clash_bodies: Vec<Fragment> = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| options.clash_body(i, fragment))
        .collect();
    for (i, body) in clash_bodies.iter().enumerate() {
        if body.structure().is_empty() {
            warn!(chain = i, "Truncations remove the whole chain from clash tests");
        }
    }
    let sat = CompatibilityMatrix::build(&fragments, config.max_terminus_distance);
    info!(
        chains = fragments.len(),
        satisfied = sat.satisfied_count(),
        "Looping seed structure."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Loop assembly" });
    let Collaborators {
        loop_search,
        clusterer,
        screen,
        ..
    } = collaborators;
    let mut assembler = LoopAssembler::new(loop_search, clusterer, screen, config);
    let input = LoopAssemblyInput {
        fragments: &fragments,
        clash_bodies: &clash_bodies,
        sat: &sat,
        exclusion,
        fixed_order: options.order.as_deref(),
    };
    let mut stats = LoopAssemblyStats::default();
    let results = assembler.assemble(&input, reporter, &mut stats)?;
    reporter.report(Progress::PhaseFinish);

    let summary = RunSummary {
        loop_assemblies: 1,
        assemblies_accepted: results.len(),
        loops: stats,
        ..Default::default()
    };
    info!(
        topologies = stats.topologies_valid,
        loop_searches = stats.loop_search_calls,
        "Workflow complete. Returning {} assembl{}.",
        results.len(),
        if results.len() == 1 { "y" } else { "ies" }
    );
    Ok(RunReport { results, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::AssemblyConfigBuilder;
    use crate::engine::testing::{
        BridgingLoopSearch, QueuedFragmentSearch, ScriptedScreen, SingleClusterer, strand,
    };

    fn sheet_seed() -> Structure {
        let strands = [strand("A", 0, 8), strand("B", 1, 8), strand("C", 2, 8)];
        let parts: Vec<&Structure> = strands.iter().map(Fragment::structure).collect();
        Structure::merge(&parts)
    }

    fn config() -> AssemblyConfig {
        AssemblyConfigBuilder::new()
            .num_iterations(1)
            .max_terminus_distance(10.0)
            .loop_lengths(1, 2)
            .build()
            .unwrap()
    }

    fn run_with(options: &LoopSeedOptions) -> Result<(RunReport, QueuedFragmentSearch), EngineError> {
        let seed = sheet_seed();
        let config = config();
        let mut search = QueuedFragmentSearch::default();
        let mut loops = BridgingLoopSearch::default();
        let mut clusterer = SingleClusterer;
        let screen = ScriptedScreen::default();
        let collaborators = Collaborators {
            fragment_search: &mut search,
            loop_search: &mut loops,
            clusterer: &mut clusterer,
            screen: &screen,
        };
        let report = run(&seed, None, options, &config, collaborators, &ProgressReporter::new())?;
        Ok((report, search))
    }

    #[test]
    fn every_satisfied_order_is_looped_without_searching_fragments() {
        let (report, search) = run_with(&LoopSeedOptions::default()).unwrap();
        let names: Vec<Vec<String>> = report.results.iter().map(|r| r.fragment_names.clone()).collect();
        assert_eq!(
            names,
            vec![
                vec!["seed_A".to_string(), "seed_B".to_string(), "seed_C".to_string()],
                vec!["seed_C".to_string(), "seed_B".to_string(), "seed_A".to_string()],
            ]
        );
        assert_eq!(search.calls, 0);
        assert_eq!(report.summary.assemblies_accepted, 2);
    }

    #[test]
    fn fixed_order_yields_a_single_assembly() {
        let options = LoopSeedOptions {
            order: Some(vec![2, 1, 0]),
            ..Default::default()
        };
        let (report, _) = run_with(&options).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].topology.order(), &[2, 1, 0]);
    }

    #[test]
    fn invalid_order_is_rejected() {
        let options = LoopSeedOptions {
            order: Some(vec![0, 1]),
            ..Default::default()
        };
        assert!(matches!(
            run_with(&options),
            Err(EngineError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn clash_bodies_are_trimmed_and_keep_key_residues() {
        let options = LoopSeedOptions {
            n_truncations: vec![2],
            c_truncations: vec![1, 3],
            chain_key_residues: vec![BTreeSet::new(), BTreeSet::from([0, 4])],
            order: None,
        };
        let fragments = chain_fragments(&sheet_seed(), "seed");
        let first = options.clash_body(0, &fragments[0]);
        let second = options.clash_body(1, &fragments[1]);
        let third = options.clash_body(2, &fragments[2]);
        assert_eq!(first.residue_count(), 5);
        assert_eq!(second.residue_count(), 5);
        assert_eq!(second.key_residues(), &BTreeSet::from([0, 4]));
        assert_eq!(third.residue_count(), 8);
        assert_eq!(second.name(), "seed_B");
    }
}
