use super::config::AssemblyConfig;
use super::error::EngineError;
use super::loops::{LoopAssembler, LoopAssemblyInput, LoopAssemblyStats};
use super::progress::{Progress, ProgressReporter};
use super::search::{
    EmptyReason, FragmentQuery, FragmentSearch, LoopClusterer, LoopSearch, SearchOutcome,
};
use super::termini::CompatibilityMatrix;
use super::topology::any_valid_topology;
use super::validation::{AssemblyResult, StructuralScreen};
use crate::core::io::pdb::to_pdb_bytes;
use crate::core::models::fragment::Fragment;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::min_distance;
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The external services an assembly run talks to.
pub struct Collaborators<'c> {
    pub fragment_search: &'c mut dyn FragmentSearch,
    pub loop_search: &'c mut dyn LoopSearch,
    pub clusterer: &'c mut dyn LoopClusterer,
    pub screen: &'c dyn StructuralScreen,
}

/// The state of one branch of the growth recursion.
///
/// Each recursive call receives its own snapshot; extending the assembly builds a new
/// state, so nothing has to be reverted when a branch is abandoned.
#[derive(Debug, Clone)]
pub struct AssemblyState {
    /// Committed fragments, in discovery order.
    pub fragments: Vec<Fragment>,
    /// Chains of the external query structure; they take part in seed grouping while
    /// fewer than two fragments are committed.
    pub query_fragments: Vec<Fragment>,
    /// Structure handed to the next fragment search.
    pub search_query: Arc<Structure>,
    /// Space the next fragment must avoid.
    pub exclusion: Arc<Structure>,
}

impl AssemblyState {
    fn extended(&self, hit: &Fragment, seed_group: &[Fragment]) -> Self {
        let mut fragments = self.fragments.clone();
        fragments.push(hit.clone());
        let basis_structures: Vec<&Structure> = seed_group.iter().map(Fragment::structure).collect();
        Self {
            fragments,
            query_fragments: self.query_fragments.clone(),
            search_query: Arc::new(Structure::merge(&basis_structures)),
            exclusion: Arc::new(Structure::merge(&[&*self.exclusion, hit.structure()])),
        }
    }
}

/// Counters describing what a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub search_calls: usize,
    pub empty_searches: usize,
    pub pruned_branches: usize,
    pub duplicates_skipped: usize,
    pub compactness_skips: usize,
    pub loop_assemblies: usize,
    pub assemblies_accepted: usize,
    pub loops: LoopAssemblyStats,
}

/// Run-wide bookkeeping threaded through the recursion.
#[derive(Debug, Default)]
pub struct AttemptLedger {
    /// Serialized fragment sets already handed to loop assembly.
    attempted: HashSet<Vec<u8>>,
    discovered: usize,
    pub summary: RunSummary,
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fragment set; returns `false` if an identical one was seen before.
    fn first_attempt(&mut self, merged: &Structure) -> bool {
        self.attempted.insert(to_pdb_bytes(merged))
    }

    fn next_name(&mut self, label: &str) -> String {
        self.discovered += 1;
        format!("x{}_{}", self.discovered, label)
    }
}

/// Depth-first fragment growth with early pruning, delegating complete fragment sets
/// to loop assembly.
pub struct Orchestrator<'a, 'c> {
    config: &'a AssemblyConfig,
    collaborators: Collaborators<'c>,
    exclusion: Option<&'a Structure>,
    reporter: &'a ProgressReporter<'a>,
}

impl<'a, 'c> Orchestrator<'a, 'c> {
    /// `exclusion` is the external exclusion structure used for loop clash tests.
    pub fn new(
        config: &'a AssemblyConfig,
        collaborators: Collaborators<'c>,
        exclusion: Option<&'a Structure>,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            config,
            collaborators,
            exclusion,
            reporter,
        }
    }

    /// Grows `initial` with the full iteration budget.
    pub fn run(
        &mut self,
        initial: AssemblyState,
    ) -> Result<(Vec<AssemblyResult>, RunSummary), EngineError> {
        let mut ledger = AttemptLedger::new();
        let results = self.grow(initial, self.config.num_iterations, &mut ledger)?;
        ledger.summary.assemblies_accepted = results.len();
        Ok((results, ledger.summary))
    }

    /// Extends `state` by one searched fragment per explored candidate and recurses
    /// until `remaining` reaches one, where complete fragment sets go to loop assembly.
    ///
    /// Empty or failed searches end the branch. A branch whose compatibility matrix
    /// cannot connect the remaining budget is abandoned before any further search.
    ///
    /// # Errors
    ///
    /// Only inconsistencies surfaced by loop assembly are returned; everything else
    /// ends the affected branch.
    pub fn grow(
        &mut self,
        state: AssemblyState,
        remaining: usize,
        ledger: &mut AttemptLedger,
    ) -> Result<Vec<AssemblyResult>, EngineError> {
        let query_present = !state.query_fragments.is_empty();
        let first_level = self.config.num_iterations.saturating_sub(query_present as usize);
        let query = FragmentQuery {
            structure: &state.search_query,
            exclusion: &state.exclusion,
            params: &self.config.fragment_search,
            first_extension: remaining == first_level,
        };
        ledger.summary.search_calls += 1;
        let hits = match self.collaborators.fragment_search.search(&query) {
            SearchOutcome::Found(hits) => hits,
            SearchOutcome::Empty(reason) => {
                ledger.summary.empty_searches += 1;
                match reason {
                    EmptyReason::Failed(message) => {
                        warn!(remaining, "Fragment search failed: {}", message)
                    }
                    EmptyReason::NoMatches => debug!(remaining, "Fragment search found nothing"),
                }
                return Ok(Vec::new());
            }
        };

        let mut results = Vec::new();
        let breadth = self.config.candidate_breadth.limit(hits.len());
        for hit in hits.into_iter().take(breadth) {
            let name = ledger.next_name(&hit.label);
            let candidate = Fragment::new(name, hit.structure);
            let mut extended = state.fragments.clone();
            extended.push(candidate.clone());

            let sat = CompatibilityMatrix::build(&extended, self.config.max_terminus_distance);
            let satisfied = sat.satisfied_count();
            if self
                .config
                .prune_rule
                .should_prune(self.config.num_iterations, remaining, satisfied)
            {
                debug!(
                    fragment = candidate.name(),
                    remaining, satisfied, "Branch pruned: termini cannot be connected"
                );
                ledger.summary.pruned_branches += 1;
                continue;
            }

            if remaining == 1 {
                if any_valid_topology(&sat) {
                    results.extend(self.close(&extended, &sat, ledger)?);
                } else {
                    debug!(fragment = candidate.name(), "No ordering connects the fragment set");
                }
                continue;
            }

            // Seed groups only shape the next search; the committed set is the same
            // for all of them.
            let groups = self.seed_groups(&state, &candidate);
            let group_limit = self.config.seed_group_breadth.limit(groups.len());
            for group in groups.into_iter().take(group_limit) {
                let child = state.extended(&candidate, &group);
                results.extend(self.grow(child, remaining - 1, ledger)?);
            }
        }
        Ok(results)
    }

    fn close(
        &mut self,
        basis: &[Fragment],
        sat: &CompatibilityMatrix,
        ledger: &mut AttemptLedger,
    ) -> Result<Vec<AssemblyResult>, EngineError> {
        let structures: Vec<&Structure> = basis.iter().map(Fragment::structure).collect();
        let merged = Structure::merge(&structures);
        if !ledger.first_attempt(&merged) {
            debug!(fragments = basis.len(), "Fragment set already attempted; skipping");
            ledger.summary.duplicates_skipped += 1;
            return Ok(Vec::new());
        }
        if let Some(gate) = self.config.screening.compactness {
            let score = self.collaborators.screen.compactness(&merged);
            if score <= gate.pre_loop_min {
                debug!(score, threshold = gate.pre_loop_min, "Fragment set not compact enough to loop");
                ledger.summary.compactness_skips += 1;
                return Ok(Vec::new());
            }
        }

        ledger.summary.loop_assemblies += 1;
        let names = basis.iter().map(Fragment::name).join(", ");
        info!(fragments = %names, "Assembling loops");
        self.reporter.report(Progress::Message(format!(
            "Loop assembly #{} over {} fragments",
            ledger.summary.loop_assemblies,
            basis.len()
        )));

        let mut assembler = LoopAssembler::new(
            &mut *self.collaborators.loop_search,
            &mut *self.collaborators.clusterer,
            self.collaborators.screen,
            self.config,
        );
        let input = LoopAssemblyInput {
            fragments: basis,
            clash_bodies: basis,
            sat,
            exclusion: self.exclusion,
            fixed_order: None,
        };
        let mut stats = LoopAssemblyStats::default();
        let results = assembler.assemble(&input, self.reporter, &mut stats)?;
        ledger.summary.loops.absorb(&stats);
        Ok(results)
    }

    /// Fragment groups the next search is seeded from.
    ///
    /// With fewer than three candidates they form a single group; otherwise every
    /// spatially adjacent pair is a group of its own.
    fn seed_groups(&self, state: &AssemblyState, candidate: &Fragment) -> Vec<Vec<Fragment>> {
        let mut pool: Vec<Fragment> = Vec::new();
        if state.fragments.len() < 2 {
            pool.extend(state.query_fragments.iter().cloned());
        }
        pool.extend(state.fragments.iter().cloned());
        pool.push(candidate.clone());

        if pool.len() < 3 {
            return vec![pool];
        }
        let positions: Vec<_> = pool.iter().map(|f| f.structure().positions()).collect();
        (0..pool.len())
            .tuple_combinations()
            .filter(|&(i, j)| {
                min_distance(&positions[i], &positions[j])
                    .is_some_and(|d| d < self.config.adjacency_threshold)
            })
            .map(|(i, j)| vec![pool[i].clone(), pool[j].clone()])
            .collect()
    }
}
