use super::cache::LoopCache;
use super::config::AssemblyConfig;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::ranking::{LoopRanker, RankedCluster};
use super::search::{LoopClusterer, LoopSearch};
use super::termini::CompatibilityMatrix;
use super::topology::{Topology, enumerate_topologies, fixed_topology};
use super::validation::{
    AssemblyResult, AssemblyValidator, JunctionCandidates, StructuralScreen, ValidationInput,
    ValidationStats,
};
use crate::core::models::fragment::Fragment;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::collections::HashMap;
use tracing::{debug, info};

/// Number of residues at one end of a CA trace spanning `window` Angstrom, counted
/// inward from the terminal residue (inclusive) and capped at the trace length.
fn terminal_span(mut cas: impl Iterator<Item = Point3<f64>>, window: f64) -> usize {
    let Some(anchor) = cas.next() else {
        return 0;
    };
    let mut count = 1;
    for position in cas {
        count += 1;
        if nalgebra::distance(&anchor, &position) >= window {
            break;
        }
    }
    count
}

/// Overlap lengths `(x, y)` for the junction `from -> to`: the last `x` residues of
/// `from` and the first `y` residues of `to` that frame the loop query.
pub fn overlap_lengths(from: &Fragment, to: &Fragment, window: f64) -> (usize, usize) {
    let head = terminal_span(from.structure().ca_positions().into_iter().rev(), window);
    let tail = terminal_span(to.structure().ca_positions().into_iter(), window);
    (head, tail)
}

/// Builds the loop search query: the C-terminal overlap of `from` followed by the
/// N-terminal overlap of `to`, as two chains.
pub fn loop_query(from: &Fragment, to: &Fragment, overlaps: (usize, usize)) -> Structure {
    let from_len = from.residue_count();
    let head = from
        .structure()
        .residue_slice(from_len.saturating_sub(overlaps.0)..from_len);
    let tail = to.structure().residue_slice(0..overlaps.1);
    Structure::merge(&[&head, &tail])
}

/// What the loop assembly path works on.
///
/// `fragments` are stitched into results; `clash_bodies` are the copies used for clash
/// tests (same indexing). `fixed_order`, when given, replaces topology enumeration.
#[derive(Debug, Clone, Copy)]
pub struct LoopAssemblyInput<'a> {
    pub fragments: &'a [Fragment],
    pub clash_bodies: &'a [Fragment],
    pub sat: &'a CompatibilityMatrix,
    pub exclusion: Option<&'a Structure>,
    pub fixed_order: Option<&'a [usize]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopAssemblyStats {
    pub topologies_considered: usize,
    pub topologies_valid: usize,
    pub topologies_skipped: usize,
    pub loop_search_calls: usize,
    pub loop_search_failures: usize,
    pub validation: ValidationStats,
}

impl LoopAssemblyStats {
    pub fn absorb(&mut self, other: &LoopAssemblyStats) {
        self.topologies_considered += other.topologies_considered;
        self.topologies_valid += other.topologies_valid;
        self.topologies_skipped += other.topologies_skipped;
        self.loop_search_calls += other.loop_search_calls;
        self.loop_search_failures += other.loop_search_failures;
        self.validation.absorb(&other.validation);
    }
}

/// Closes a fixed fragment set into complete structures, one per feasible topology.
pub struct LoopAssembler<'t> {
    ranker: LoopRanker<'t>,
    validator: AssemblyValidator<'t>,
    overlap_window: f64,
}

impl<'t> LoopAssembler<'t> {
    pub fn new(
        search: &'t mut dyn LoopSearch,
        clusterer: &'t mut dyn LoopClusterer,
        screen: &'t dyn StructuralScreen,
        config: &AssemblyConfig,
    ) -> Self {
        Self {
            ranker: LoopRanker::new(search, clusterer, config.loops.clone()),
            validator: AssemblyValidator::new(screen, &config.screening),
            overlap_window: config.loops.overlap_window,
        }
    }

    /// Enumerates the valid topologies of the fragment set and validates each, keeping
    /// the first accepted combination per topology.
    ///
    /// Loop clusters are ranked once per ordered fragment pair and shared between the
    /// topologies that use the junction. A topology with a junction that has no
    /// clusters is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTopology`] if a fixed order is not a permutation
    /// of the fragments, or propagates inconsistencies found during validation.
    pub fn assemble(
        &mut self,
        input: &LoopAssemblyInput<'_>,
        reporter: &ProgressReporter,
        stats: &mut LoopAssemblyStats,
    ) -> Result<Vec<AssemblyResult>, EngineError> {
        let topologies: Vec<Topology> = match input.fixed_order {
            Some(order) => {
                stats.topologies_considered += 1;
                fixed_topology(order, input.sat)?.into_iter().collect()
            }
            None => {
                let enumeration = enumerate_topologies(input.sat);
                stats.topologies_considered += enumeration.considered;
                enumeration.valid
            }
        };
        stats.topologies_valid += topologies.len();
        debug!(
            fragments = input.fragments.len(),
            valid = topologies.len(),
            "Enumerated topologies"
        );

        let calls_before = self.ranker.search_calls();
        let failures_before = self.ranker.failures();
        let mut junction_memo: HashMap<(usize, usize), JunctionCandidates> = HashMap::new();
        let mut results = Vec::new();

        reporter.report(Progress::TaskStart {
            total_steps: topologies.len() as u64,
        });
        for topology in &topologies {
            let junctions = self.junctions_for(topology, input.fragments, &mut junction_memo)?;
            if junctions.iter().any(|j| j.clusters.is_empty()) {
                debug!(%topology, "Topology skipped: a junction has no loop clusters");
                stats.topologies_skipped += 1;
                reporter.report(Progress::TaskIncrement);
                continue;
            }

            let validation_input = ValidationInput {
                topology,
                fragments: input.fragments,
                clash_bodies: input.clash_bodies,
                junctions: &junctions,
                exclusion: input.exclusion,
            };
            let mut cache = LoopCache::new();
            if let Some(result) =
                self.validator
                    .validate(&validation_input, &mut cache, &mut stats.validation)?
            {
                info!(
                    %topology,
                    loops = ?result.loop_labels,
                    residues = result.structure.residue_count(),
                    "Assembly accepted"
                );
                results.push(result);
            } else {
                debug!(%topology, "No loop combination survived validation");
            }
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);

        stats.loop_search_calls += self.ranker.search_calls() - calls_before;
        stats.loop_search_failures += self.ranker.failures() - failures_before;
        Ok(results)
    }

    fn junctions_for(
        &mut self,
        topology: &Topology,
        fragments: &[Fragment],
        memo: &mut HashMap<(usize, usize), JunctionCandidates>,
    ) -> Result<Vec<JunctionCandidates>, EngineError> {
        let mut junctions = Vec::with_capacity(topology.len().saturating_sub(1));
        for (from, to) in topology.junctions() {
            if let Some(known) = memo.get(&(from, to)) {
                junctions.push(known.clone());
                continue;
            }
            let (Some(upstream), Some(downstream)) = (fragments.get(from), fragments.get(to))
            else {
                return Err(EngineError::InvalidTopology {
                    order: topology.order().to_vec(),
                    reason: format!("junction {}->{} out of range", from, to),
                });
            };
            let overlaps = overlap_lengths(upstream, downstream, self.overlap_window);
            let query = loop_query(upstream, downstream, overlaps);
            let clusters: Vec<RankedCluster> = self.ranker.rank(&query, overlaps);
            debug!(
                from = upstream.name(),
                to = downstream.name(),
                clusters = clusters.len(),
                "Ranked loop candidates for junction"
            );
            let candidates = JunctionCandidates {
                from,
                to,
                overlaps,
                clusters,
            };
            memo.insert((from, to), candidates.clone());
            junctions.push(candidates);
        }
        Ok(junctions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::AssemblyConfigBuilder;
    use crate::engine::testing::{BridgingLoopSearch, SingleClusterer, ScriptedScreen, strand};
    use crate::engine::validation::GeometricScreen;
    use std::sync::{Arc, Mutex};

    fn config(min: usize, max: usize) -> AssemblyConfig {
        AssemblyConfigBuilder::new()
            .num_iterations(1)
            .max_terminus_distance(10.0)
            .loop_lengths(min, max)
            .build()
            .unwrap()
    }

    fn sheet() -> Vec<Fragment> {
        vec![strand("A", 0, 8), strand("B", 1, 8), strand("C", 2, 8)]
    }

    #[test]
    fn overlap_lengths_cover_the_window() {
        let fragments = sheet();
        // CA spacing 3.8: the fourth residue from the end is the first at >= 10 A.
        assert_eq!(overlap_lengths(&fragments[0], &fragments[1], 10.0), (4, 4));
        assert_eq!(overlap_lengths(&fragments[0], &fragments[1], 3.0), (2, 2));
        assert_eq!(overlap_lengths(&fragments[0], &fragments[1], 100.0), (8, 8));
    }

    #[test]
    fn loop_query_holds_both_overlaps() {
        let fragments = sheet();
        let query = loop_query(&fragments[0], &fragments[1], (3, 2));
        assert_eq!(query.residue_count(), 5);
        assert_eq!(query.chain_count(), 2);
        let cas = query.ca_positions();
        assert_eq!(cas[2], fragments[0].structure().ca_positions()[7]);
        assert_eq!(cas[3], fragments[1].structure().ca_positions()[0]);
    }

    #[test]
    fn hairpin_sheet_closes_in_both_directions() {
        let fragments = sheet();
        let sat = CompatibilityMatrix::build(&fragments, 10.0);
        let config = config(1, 3);
        let screen = GeometricScreen::from_config(&config.screening);
        let mut search = BridgingLoopSearch::default();
        let mut clusterer = SingleClusterer;
        let mut assembler = LoopAssembler::new(&mut search, &mut clusterer, &screen, &config);

        let input = LoopAssemblyInput {
            fragments: &fragments,
            clash_bodies: &fragments,
            sat: &sat,
            exclusion: None,
            fixed_order: None,
        };
        let mut stats = LoopAssemblyStats::default();
        let results = assembler
            .assemble(&input, &ProgressReporter::new(), &mut stats)
            .unwrap();

        let orders: Vec<Vec<usize>> = results.iter().map(|r| r.topology.order().to_vec()).collect();
        assert_eq!(orders, vec![vec![0, 1, 2], vec![2, 1, 0]]);
        assert_eq!(stats.topologies_considered, 6);
        assert_eq!(stats.topologies_valid, 2);
        // Four ordered junctions, three lengths each; shared junctions are not re-queried.
        assert_eq!(stats.loop_search_calls, 12);
        // 3 strands of 8 plus a one-residue hairpin per junction.
        assert!(results.iter().all(|r| r.structure.residue_count() == 26));
        drop(assembler);
        assert_eq!(search.calls, 12);
    }

    #[test]
    fn fixed_order_restricts_to_one_topology() {
        let fragments = sheet();
        let sat = CompatibilityMatrix::build(&fragments, 10.0);
        let config = config(1, 1);
        let screen = ScriptedScreen::default();
        let mut search = BridgingLoopSearch::default();
        let mut clusterer = SingleClusterer;
        let mut assembler = LoopAssembler::new(&mut search, &mut clusterer, &screen, &config);
        let order = [2, 1, 0];
        let input = LoopAssemblyInput {
            fragments: &fragments,
            clash_bodies: &fragments,
            sat: &sat,
            exclusion: None,
            fixed_order: Some(&order),
        };
        let mut stats = LoopAssemblyStats::default();
        let results = assembler
            .assemble(&input, &ProgressReporter::new(), &mut stats)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].fragment_names, vec!["C", "B", "A"]);
        assert_eq!(stats.loop_search_calls, 2);
    }

    #[test]
    fn non_permutation_order_is_an_error() {
        let fragments = sheet();
        let sat = CompatibilityMatrix::build(&fragments, 10.0);
        let config = config(1, 1);
        let screen = ScriptedScreen::default();
        let mut search = BridgingLoopSearch::default();
        let mut clusterer = SingleClusterer;
        let mut assembler = LoopAssembler::new(&mut search, &mut clusterer, &screen, &config);
        let order = [0, 0, 1];
        let input = LoopAssemblyInput {
            fragments: &fragments,
            clash_bodies: &fragments,
            sat: &sat,
            exclusion: None,
            fixed_order: Some(&order),
        };
        let err = assembler
            .assemble(&input, &ProgressReporter::new(), &mut LoopAssemblyStats::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTopology { .. }));
    }

    #[test]
    fn topology_with_unclosable_junction_is_skipped() {
        let fragments = sheet();
        let sat = CompatibilityMatrix::build(&fragments, 10.0);
        // Length 5 gives a CA spacing below what the bridging search accepts.
        let config = config(5, 5);
        let screen = ScriptedScreen::default();
        let mut search = BridgingLoopSearch::default();
        let mut clusterer = SingleClusterer;
        let mut assembler = LoopAssembler::new(&mut search, &mut clusterer, &screen, &config);
        let input = LoopAssemblyInput {
            fragments: &fragments,
            clash_bodies: &fragments,
            sat: &sat,
            exclusion: None,
            fixed_order: None,
        };
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(format!("{:?}", event));
        }));
        let mut stats = LoopAssemblyStats::default();
        let results = assembler.assemble(&input, &reporter, &mut stats).unwrap();
        assert!(results.is_empty());
        assert_eq!(stats.topologies_skipped, 2);
        assert_eq!(stats.validation.combinations_tried, 0);

        let events = events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("TaskStart { total_steps: 2 }"));
        assert_eq!(events.iter().filter(|e| *e == "TaskIncrement").count(), 2);
        assert_eq!(events.last().map(String::as_str), Some("TaskFinish"));
    }
}
