use super::cache::{CandidateKey, LoopCache};
use super::config::{CompactnessGate, ScreeningConfig};
use super::error::EngineError;
use super::ranking::RankedCluster;
use super::stitching::Stitcher;
use super::topology::Topology;
use crate::core::analysis::clash::{ClashProbe, any_clash};
use crate::core::analysis::compactness::{
    DEFAULT_ALPHA_RADIUS, DEFAULT_VOXEL_RESOLUTION, alpha_hull_compactness,
};
use crate::core::analysis::gaps::has_structural_gap;
use crate::core::models::fragment::Fragment;
use crate::core::models::structure::Structure;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Geometric predicates applied while validating loop combinations.
pub trait StructuralScreen {
    /// Whether any two of the given structures clash.
    fn clashes(&self, probes: &[ClashProbe<'_>]) -> bool;
    /// Whether the structure has missing residues.
    fn has_gaps(&self, structure: &Structure) -> bool;
    /// Scalar compactness score; higher is more compact.
    fn compactness(&self, structure: &Structure) -> f64;
}

/// The built-in screen: heavy-atom distance clashes, CA-CA chain breaks and
/// alpha-hull compactness of the CA trace.
#[derive(Debug, Clone, Copy)]
pub struct GeometricScreen {
    pub clash_distance: f64,
    pub max_ca_gap: f64,
    pub alpha_radius: f64,
    pub voxel_resolution: f64,
}

impl GeometricScreen {
    pub fn from_config(config: &ScreeningConfig) -> Self {
        Self {
            clash_distance: config.clash_distance,
            max_ca_gap: config.max_ca_gap,
            alpha_radius: DEFAULT_ALPHA_RADIUS,
            voxel_resolution: DEFAULT_VOXEL_RESOLUTION,
        }
    }
}

impl StructuralScreen for GeometricScreen {
    fn clashes(&self, probes: &[ClashProbe<'_>]) -> bool {
        any_clash(probes, self.clash_distance)
    }

    fn has_gaps(&self, structure: &Structure) -> bool {
        has_structural_gap(structure, self.max_ca_gap)
    }

    fn compactness(&self, structure: &Structure) -> f64 {
        alpha_hull_compactness(structure, self.alpha_radius, self.voxel_resolution)
    }
}

/// Cluster indices known to fail at each junction.
///
/// Only ever grows; lives for a single topology's validation pass.
#[derive(Debug, Clone)]
pub struct ForbiddenSet {
    per_junction: Vec<HashSet<usize>>,
}

impl ForbiddenSet {
    pub fn new(junctions: usize) -> Self {
        Self {
            per_junction: vec![HashSet::new(); junctions],
        }
    }

    pub fn forbid(&mut self, junction: usize, index: usize) {
        if let Some(set) = self.per_junction.get_mut(junction) {
            set.insert(index);
        }
    }

    pub fn is_forbidden(&self, junction: usize, index: usize) -> bool {
        self.per_junction
            .get(junction)
            .is_some_and(|set| set.contains(&index))
    }

    /// Whether any choice of the combination is forbidden.
    pub fn blocks(&self, combination: &[usize]) -> bool {
        combination
            .iter()
            .enumerate()
            .any(|(junction, &index)| self.is_forbidden(junction, index))
    }

    pub fn len(&self) -> usize {
        self.per_junction.iter().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazily yields every index vector `v` with `v[i] < bounds[i]`, by ascending sum;
/// vectors of equal sum come in lexicographic order.
#[derive(Debug, Clone)]
pub struct CombinationsBySum {
    bounds: Vec<usize>,
    suffix_max: Vec<usize>,
    next_sum: usize,
    max_sum: usize,
    pending: VecDeque<Vec<usize>>,
    exhausted: bool,
}

impl CombinationsBySum {
    pub fn new(bounds: Vec<usize>) -> Self {
        let exhausted = bounds.iter().any(|&b| b == 0);
        let mut suffix_max = vec![0; bounds.len() + 1];
        for i in (0..bounds.len()).rev() {
            suffix_max[i] = suffix_max[i + 1] + bounds[i].saturating_sub(1);
        }
        Self {
            max_sum: suffix_max[0],
            bounds,
            suffix_max,
            next_sum: 0,
            pending: VecDeque::new(),
            exhausted,
        }
    }

    fn fill(&self, pos: usize, remaining: usize, current: &mut Vec<usize>, out: &mut VecDeque<Vec<usize>>) {
        if pos == self.bounds.len() {
            if remaining == 0 {
                out.push_back(current.clone());
            }
            return;
        }
        let lo = remaining.saturating_sub(self.suffix_max[pos + 1]);
        let hi = remaining.min(self.bounds[pos] - 1);
        for value in lo..=hi {
            current.push(value);
            self.fill(pos + 1, remaining - value, current, out);
            current.pop();
        }
    }
}

impl Iterator for CombinationsBySum {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        while self.pending.is_empty() && self.next_sum <= self.max_sum {
            let mut level = VecDeque::new();
            self.fill(0, self.next_sum, &mut Vec::new(), &mut level);
            self.pending = level;
            self.next_sum += 1;
        }
        self.pending.pop_front()
    }
}

/// Ranked loop candidates for one junction of a topology.
#[derive(Debug, Clone)]
pub struct JunctionCandidates {
    pub from: usize,
    pub to: usize,
    /// Residues of the loop duplicating the end of `from` and the start of `to`.
    pub overlaps: (usize, usize),
    pub clusters: Vec<RankedCluster>,
}

/// A validated, stitched assembly.
#[derive(Debug, Clone)]
pub struct AssemblyResult {
    pub structure: Arc<Structure>,
    pub topology: Topology,
    /// Chosen cluster index per junction.
    pub combination: Vec<usize>,
    pub fragment_names: Vec<String>,
    pub loop_labels: Vec<String>,
    pub compactness: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub combinations_tried: usize,
    pub forbidden_skips: usize,
    pub load_failures: usize,
    pub clash_rejections: usize,
    pub gap_rejections: usize,
    pub loop_clash_rejections: usize,
    pub stitch_rejections: usize,
    pub compactness_rejections: usize,
}

impl ValidationStats {
    pub fn absorb(&mut self, other: &ValidationStats) {
        self.combinations_tried += other.combinations_tried;
        self.forbidden_skips += other.forbidden_skips;
        self.load_failures += other.load_failures;
        self.clash_rejections += other.clash_rejections;
        self.gap_rejections += other.gap_rejections;
        self.loop_clash_rejections += other.loop_clash_rejections;
        self.stitch_rejections += other.stitch_rejections;
        self.compactness_rejections += other.compactness_rejections;
    }
}

/// Everything a validation pass looks at.
///
/// `fragments` are stitched into the result; `clash_bodies` (same indexing) are the
/// copies used for clash tests, possibly truncated and carrying key residues.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub topology: &'a Topology,
    pub fragments: &'a [Fragment],
    pub clash_bodies: &'a [Fragment],
    pub junctions: &'a [JunctionCandidates],
    pub exclusion: Option<&'a Structure>,
}

enum LoopVerdict {
    Accepted(Arc<Structure>),
    Rejected,
}

pub struct AssemblyValidator<'s> {
    screen: &'s dyn StructuralScreen,
    stitcher: Stitcher,
    compactness: Option<CompactnessGate>,
}

impl<'s> AssemblyValidator<'s> {
    pub fn new(screen: &'s dyn StructuralScreen, config: &ScreeningConfig) -> Self {
        Self {
            screen,
            stitcher: Stitcher::new(config.clash_distance, config.stitch_min_separation),
            compactness: config.compactness,
        }
    }

    /// Searches the loop combinations of one topology for the first that passes every
    /// screen.
    ///
    /// Combinations are tried by ascending sum of cluster ranks. A loop that clashes
    /// with the scene or has a gap is forbidden at its junction for the rest of the
    /// pass; a combination rejected at any stage drops the loops it materialized from
    /// `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only for inconsistent input (junction count not
    /// matching the topology, fragment index out of range).
    pub fn validate(
        &self,
        input: &ValidationInput<'_>,
        cache: &mut LoopCache,
        stats: &mut ValidationStats,
    ) -> Result<Option<AssemblyResult>, EngineError> {
        let topology = input.topology;
        if input.junctions.len() + 1 != topology.len() {
            return Err(EngineError::InvalidTopology {
                order: topology.order().to_vec(),
                reason: format!("{} junctions supplied", input.junctions.len()),
            });
        }
        for &index in topology.order() {
            if index >= input.fragments.len() || index >= input.clash_bodies.len() {
                return Err(EngineError::InvalidTopology {
                    order: topology.order().to_vec(),
                    reason: format!("fragment index {} out of range", index),
                });
            }
        }

        let bounds: Vec<usize> = input.junctions.iter().map(|j| j.clusters.len()).collect();
        let mut forbidden = ForbiddenSet::new(input.junctions.len());
        let mut cleared: HashSet<CandidateKey> = HashSet::new();

        for combination in CombinationsBySum::new(bounds) {
            if forbidden.blocks(&combination) {
                stats.forbidden_skips += 1;
                continue;
            }
            stats.combinations_tried += 1;
            cache.begin_combination();

            let mut loops = Vec::with_capacity(combination.len());
            for (junction, &index) in combination.iter().enumerate() {
                match self.screen_loop(input, junction, index, cache, &mut cleared, stats) {
                    LoopVerdict::Accepted(structure) => loops.push(structure),
                    LoopVerdict::Rejected => {
                        forbidden.forbid(junction, index);
                        break;
                    }
                }
            }
            if loops.len() != combination.len() {
                cache.discard_fresh();
                continue;
            }

            let probes: Vec<ClashProbe<'_>> = loops
                .iter()
                .zip(&combination)
                .enumerate()
                .map(|(junction, (structure, &index))| {
                    ClashProbe::with_retained(
                        structure,
                        &input.junctions[junction].clusters[index].key_residues,
                    )
                })
                .collect();
            if self.screen.clashes(&probes) {
                stats.loop_clash_rejections += 1;
                cache.discard_fresh();
                continue;
            }

            let mut items: Vec<&Structure> = Vec::with_capacity(2 * topology.len());
            for (k, &fragment) in topology.order().iter().enumerate() {
                items.push(input.fragments[fragment].structure());
                if let Some(structure) = loops.get(k) {
                    items.push(structure);
                }
            }
            let overlaps: Vec<(usize, usize)> = input.junctions.iter().map(|j| j.overlaps).collect();
            let outcome = self.stitcher.stitch(&items, &overlaps)?;
            if outcome.clashing {
                stats.stitch_rejections += 1;
                cache.discard_fresh();
                continue;
            }

            let compactness = match self.compactness {
                Some(gate) => {
                    let score = self.screen.compactness(&outcome.structure);
                    if score < gate.final_min {
                        debug!(score, threshold = gate.final_min, "Assembly rejected as not compact");
                        stats.compactness_rejections += 1;
                        cache.discard_fresh();
                        continue;
                    }
                    Some(score)
                }
                None => None,
            };

            return Ok(Some(AssemblyResult {
                structure: Arc::new(outcome.structure),
                topology: topology.clone(),
                loop_labels: combination
                    .iter()
                    .enumerate()
                    .map(|(junction, &index)| input.junctions[junction].clusters[index].label.clone())
                    .collect(),
                combination,
                fragment_names: topology
                    .order()
                    .iter()
                    .map(|&f| input.fragments[f].name().to_string())
                    .collect(),
                compactness,
            }));
        }

        Ok(None)
    }

    /// Materializes one loop and, the first time it is seen in this pass, tests it
    /// against the exclusion volume and the fragments it does not connect, then for gaps.
    fn screen_loop(
        &self,
        input: &ValidationInput<'_>,
        junction: usize,
        index: usize,
        cache: &mut LoopCache,
        cleared: &mut HashSet<CandidateKey>,
        stats: &mut ValidationStats,
    ) -> LoopVerdict {
        let cluster = &input.junctions[junction].clusters[index];
        let structure = match cache.materialize((junction, index), &cluster.source) {
            Ok(structure) => structure,
            Err(e) => {
                warn!(candidate = %cluster.label, "Failed to load loop candidate: {}", e);
                stats.load_failures += 1;
                return LoopVerdict::Rejected;
            }
        };
        if cleared.contains(&(junction, index)) {
            return LoopVerdict::Accepted(structure);
        }

        let loop_probe = ClashProbe::with_retained(&structure, &cluster.key_residues);
        let connected = [input.junctions[junction].from, input.junctions[junction].to];
        let mut scene: Vec<ClashProbe<'_>> = Vec::new();
        if let Some(exclusion) = input.exclusion {
            scene.push(ClashProbe::new(exclusion));
        }
        for &fragment in input.topology.order() {
            if connected.contains(&fragment) {
                continue;
            }
            let body = &input.clash_bodies[fragment];
            scene.push(ClashProbe::with_retained(body.structure(), body.key_residues()));
        }

        if scene.iter().any(|other| self.screen.clashes(&[loop_probe, *other])) {
            debug!(candidate = %cluster.label, junction, "Loop clashes with the scene");
            stats.clash_rejections += 1;
            return LoopVerdict::Rejected;
        }
        if self.screen.has_gaps(&structure) {
            debug!(candidate = %cluster.label, junction, "Loop has a structural gap");
            stats.gap_rejections += 1;
            return LoopVerdict::Rejected;
        }
        cleared.insert((junction, index));
        LoopVerdict::Accepted(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{ScriptedScreen, line_fragment, line_segment, ranked};

    #[test]
    fn combinations_come_by_ascending_sum_then_lexicographic() {
        let all: Vec<Vec<usize>> = CombinationsBySum::new(vec![2, 3]).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![1, 0],
                vec![0, 2],
                vec![1, 1],
                vec![1, 2],
            ]
        );
    }

    #[test]
    fn combinations_cover_the_full_product_once() {
        let all: Vec<Vec<usize>> = CombinationsBySum::new(vec![3, 2, 4]).collect();
        assert_eq!(all.len(), 24);
        let unique: HashSet<Vec<usize>> = all.iter().cloned().collect();
        assert_eq!(unique.len(), 24);
        let sums: Vec<usize> = all.iter().map(|v| v.iter().sum()).collect();
        assert!(sums.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn combinations_of_empty_dimension_are_empty() {
        assert_eq!(CombinationsBySum::new(vec![2, 0]).count(), 0);
        assert_eq!(CombinationsBySum::new(vec![]).collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn forbidden_set_grows_per_junction() {
        let mut forbidden = ForbiddenSet::new(2);
        assert!(forbidden.is_empty());
        forbidden.forbid(1, 3);
        forbidden.forbid(1, 3);
        forbidden.forbid(7, 0);
        assert_eq!(forbidden.len(), 1);
        assert!(forbidden.blocks(&[0, 3]));
        assert!(!forbidden.blocks(&[3, 0]));
    }

    #[test]
    fn built_in_screen_keeps_a_lone_strand_from_looping() {
        let screen = GeometricScreen::from_config(&ScreeningConfig::default());
        let gate = CompactnessGate::default();
        let lone = crate::engine::testing::strand("A", 0, 20);
        let score = screen.compactness(lone.structure());
        assert!(score > 0.0 && score <= gate.pre_loop_min, "score {score}");
    }

    /// Three fragments on a line joined by two loops; every candidate has the same
    /// geometry and is told apart by its residue name.
    struct Scene {
        fragments: Vec<Fragment>,
        junctions: Vec<JunctionCandidates>,
        topology: Topology,
    }

    fn scene(first: &[&str], second: &[&str]) -> Scene {
        let fragments = vec![
            line_fragment("A", 0, 4),
            line_fragment("B", 6, 4),
            line_fragment("C", 12, 4),
        ];
        let clusters = |start: usize, names: &[&str]| -> Vec<RankedCluster> {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| ranked(&format!("{}{}", name, i), line_segment(start, 4, name), 10 - i))
                .collect()
        };
        Scene {
            fragments,
            junctions: vec![
                JunctionCandidates {
                    from: 0,
                    to: 1,
                    overlaps: (1, 1),
                    clusters: clusters(3, first),
                },
                JunctionCandidates {
                    from: 1,
                    to: 2,
                    overlaps: (1, 1),
                    clusters: clusters(9, second),
                },
            ],
            topology: Topology::new(vec![0, 1, 2]),
        }
    }

    fn input(scene: &Scene) -> ValidationInput<'_> {
        ValidationInput {
            topology: &scene.topology,
            fragments: &scene.fragments,
            clash_bodies: &scene.fragments,
            junctions: &scene.junctions,
            exclusion: None,
        }
    }

    #[test]
    fn first_clean_combination_is_accepted() {
        let scene = scene(&["ALA", "ALA"], &["SER"]);
        let screen = ScriptedScreen::default();
        let validator = AssemblyValidator::new(&screen, &ScreeningConfig::default());
        let mut stats = ValidationStats::default();
        let result = validator
            .validate(&input(&scene), &mut LoopCache::new(), &mut stats)
            .unwrap()
            .unwrap();
        assert_eq!(result.combination, vec![0, 0]);
        assert_eq!(result.fragment_names, vec!["A", "B", "C"]);
        // 4 + 2 + 4 + 2 + 4 residues after trimming the loop overlaps.
        assert_eq!(result.structure.residue_count(), 16);
        assert_eq!(stats.combinations_tried, 1);
    }

    #[test]
    fn gapped_loop_is_forbidden_and_never_selected_again() {
        let scene = scene(&["GLY", "ALA"], &["SER", "THR"]);
        let screen = ScriptedScreen {
            gapped_names: HashSet::from(["GLY".to_string()]),
            ..Default::default()
        };
        let validator = AssemblyValidator::new(&screen, &ScreeningConfig::default());
        let mut stats = ValidationStats::default();
        let result = validator
            .validate(&input(&scene), &mut LoopCache::new(), &mut stats)
            .unwrap()
            .unwrap();

        // [0,0] fails on the gap, [0,1] is skipped without being looked at, [1,0] wins.
        assert_eq!(result.combination, vec![1, 0]);
        assert_eq!(stats.gap_rejections, 1);
        assert_eq!(stats.forbidden_skips, 1);
        assert_eq!(screen.gap_checks("GLY"), 1);
    }

    #[test]
    fn loop_clashing_with_unconnected_fragment_is_rejected() {
        let mut scene = scene(&["ALA"], &["SER"]);
        // Put the first loop right on top of fragment C.
        scene.junctions[0].clusters = vec![ranked("bad", line_segment(12, 4, "ALA"), 5)];
        let screen = ScriptedScreen::default();
        let validator = AssemblyValidator::new(&screen, &ScreeningConfig::default());
        let mut stats = ValidationStats::default();
        let mut cache = LoopCache::new();
        let result = validator.validate(&input(&scene), &mut cache, &mut stats).unwrap();
        assert!(result.is_none());
        assert_eq!(stats.clash_rejections, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn exclusion_volume_rejects_overlapping_loops() {
        let scene = scene(&["ALA"], &["SER"]);
        let exclusion = line_segment(9, 2, "TRP");
        let screen = ScriptedScreen::default();
        let validator = AssemblyValidator::new(&screen, &ScreeningConfig::default());
        let mut stats = ValidationStats::default();
        let mut validation_input = input(&scene);
        validation_input.exclusion = Some(&exclusion);
        let result = validator
            .validate(&validation_input, &mut LoopCache::new(), &mut stats)
            .unwrap();
        assert!(result.is_none());
        assert_eq!(stats.clash_rejections, 1);
    }

    #[test]
    fn insufficient_compactness_rejects_and_discards_artifacts() {
        let scene = scene(&["ALA"], &["SER"]);
        let screen = ScriptedScreen {
            compactness: 0.10,
            ..Default::default()
        };
        let config = ScreeningConfig {
            compactness: Some(CompactnessGate {
                pre_loop_min: 0.1,
                final_min: 0.138,
            }),
            ..Default::default()
        };
        let validator = AssemblyValidator::new(&screen, &config);
        let mut stats = ValidationStats::default();
        let mut cache = LoopCache::new();
        let result = validator.validate(&input(&scene), &mut cache, &mut stats).unwrap();
        assert!(result.is_none());
        assert_eq!(stats.compactness_rejections, 1);
        assert_eq!(cache.loads(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn sufficient_compactness_is_recorded() {
        let scene = scene(&["ALA"], &["SER"]);
        let screen = ScriptedScreen {
            compactness: 0.138,
            ..Default::default()
        };
        let config = ScreeningConfig {
            compactness: Some(CompactnessGate::default()),
            ..Default::default()
        };
        let validator = AssemblyValidator::new(&screen, &config);
        let result = validator
            .validate(&input(&scene), &mut LoopCache::new(), &mut ValidationStats::default())
            .unwrap()
            .unwrap();
        assert_eq!(result.compactness, Some(0.138));
    }

    #[test]
    fn junction_count_must_match_topology() {
        let scene = scene(&["ALA"], &["SER"]);
        let topology = Topology::new(vec![0, 1]);
        let mut validation_input = input(&scene);
        validation_input.topology = &topology;
        let screen = ScriptedScreen::default();
        let validator = AssemblyValidator::new(&screen, &ScreeningConfig::default());
        assert!(matches!(
            validator.validate(&validation_input, &mut LoopCache::new(), &mut ValidationStats::default()),
            Err(EngineError::InvalidTopology { .. })
        ));
    }
}
