//! Fixtures shared by the engine's unit tests.

use super::ranking::RankedCluster;
use super::search::{
    FragmentHit, FragmentQuery, FragmentSearch, LoopClusterer, LoopQuery, LoopSearch, RawCluster,
    RawLoop, SearchOutcome,
};
use super::validation::StructuralScreen;
use crate::core::analysis::clash::{ClashProbe, any_clash};
use crate::core::io::source::StructureSource;
use crate::core::models::builder::StructureBuilder;
use crate::core::models::fragment::Fragment;
use crate::core::models::structure::Structure;
use nalgebra::{Point3, Vector3};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub const RISE: f64 = 3.8;
pub const STRAND_SPACING: f64 = 4.8;

/// Minimal backbone (N, CA, C) on the given CA trace, residues numbered from 1.
pub fn backbone(cas: &[Point3<f64>], name: &str) -> Structure {
    let mut builder = StructureBuilder::new();
    for (i, ca) in cas.iter().enumerate() {
        builder.start_residue(i as isize + 1, name);
        builder.add_atom("N", ca - Vector3::new(0.0, 0.0, 1.0), "N", 1.0, 0.0);
        builder.add_atom("CA", *ca, "C", 1.0, 0.0);
        builder.add_atom("C", ca + Vector3::new(0.0, 0.0, 1.0), "C", 1.0, 0.0);
    }
    builder.build()
}

/// Residues `start..start + count` of an ideal straight backbone along x.
pub fn line_segment(start: usize, count: usize, name: &str) -> Structure {
    let cas: Vec<Point3<f64>> = (start..start + count)
        .map(|i| Point3::new(i as f64 * RISE, 0.0, 0.0))
        .collect();
    backbone(&cas, name)
}

pub fn line_fragment(name: &str, start: usize, count: usize) -> Fragment {
    Fragment::new(name, line_segment(start, count, "ALA"))
}

/// A straight strand in sheet row `row` (y = row * 4.8 A), running +x on even rows
/// and -x on odd rows, so consecutive rows form hairpins.
pub fn strand(name: &str, row: usize, count: usize) -> Fragment {
    let y = row as f64 * STRAND_SPACING;
    let mut cas: Vec<Point3<f64>> = (0..count)
        .map(|i| Point3::new(i as f64 * RISE, y, 0.0))
        .collect();
    if row % 2 == 1 {
        cas.reverse();
    }
    Fragment::new(name, backbone(&cas, "ALA"))
}

pub fn ranked(label: &str, structure: Structure, member_count: usize) -> RankedCluster {
    RankedCluster {
        source: StructureSource::Loaded(Arc::new(structure)),
        label: label.to_string(),
        length: 0,
        member_count,
        key_residues: BTreeSet::new(),
    }
}

/// Real distance-based clashes; gaps and compactness are scripted.
pub struct ScriptedScreen {
    pub gapped_names: HashSet<String>,
    pub compactness: f64,
    pub clash_distance: f64,
    pub(crate) gap_calls: RefCell<HashMap<String, usize>>,
}

impl Default for ScriptedScreen {
    fn default() -> Self {
        Self {
            gapped_names: HashSet::new(),
            compactness: 1.0,
            clash_distance: 2.5,
            gap_calls: RefCell::new(HashMap::new()),
        }
    }
}

impl ScriptedScreen {
    pub fn gap_checks(&self, name: &str) -> usize {
        self.gap_calls.borrow().get(name).copied().unwrap_or(0)
    }
}

impl StructuralScreen for ScriptedScreen {
    fn clashes(&self, probes: &[ClashProbe<'_>]) -> bool {
        any_clash(probes, self.clash_distance)
    }

    fn has_gaps(&self, structure: &Structure) -> bool {
        let name = structure.sequence().first().cloned().unwrap_or_default();
        *self.gap_calls.borrow_mut().entry(name.clone()).or_default() += 1;
        self.gapped_names.contains(&name)
    }

    fn compactness(&self, _structure: &Structure) -> f64 {
        self.compactness
    }
}

/// Returns queued hit lists, one per call; `Empty` once the queue runs dry.
#[derive(Default)]
pub struct QueuedFragmentSearch {
    pub queue: Vec<Vec<FragmentHit>>,
    pub calls: usize,
    pub first_extension_flags: Vec<bool>,
    pub query_residue_counts: Vec<usize>,
    pub exclusion_residue_counts: Vec<usize>,
}

impl FragmentSearch for QueuedFragmentSearch {
    fn search(&mut self, query: &FragmentQuery<'_>) -> SearchOutcome<FragmentHit> {
        self.calls += 1;
        self.first_extension_flags.push(query.first_extension);
        self.query_residue_counts.push(query.structure.residue_count());
        self.exclusion_residue_counts.push(query.exclusion.residue_count());
        if self.queue.is_empty() {
            return SearchOutcome::failed("search engine unavailable");
        }
        SearchOutcome::from_hits(self.queue.remove(0))
    }
}

pub fn hit(label: &str, structure: Structure) -> FragmentHit {
    FragmentHit {
        label: label.to_string(),
        structure,
        rmsd: Some(0.5),
    }
}

/// Answers every loop query with a straight bridge between the two overlap regions
/// when the requested length gives a plausible CA spacing.
#[derive(Default)]
pub struct BridgingLoopSearch {
    pub calls: usize,
}

impl LoopSearch for BridgingLoopSearch {
    fn search(&mut self, query: &LoopQuery<'_>) -> SearchOutcome<RawLoop> {
        self.calls += 1;
        let cas = query.structure.ca_positions();
        let (head, tail) = query.overlaps;
        if cas.len() != head + tail || head == 0 || tail == 0 {
            return SearchOutcome::failed("malformed loop query");
        }
        let from = cas[head - 1];
        let to = cas[head];
        let spacing = nalgebra::distance(&from, &to) / (query.length + 1) as f64;
        if !(2.2..=4.0).contains(&spacing) {
            return SearchOutcome::from_hits(vec![]);
        }
        let step = (to - from) / (query.length + 1) as f64;
        let mut trace: Vec<Point3<f64>> = cas[..head].to_vec();
        trace.extend((1..=query.length).map(|k| from + step * k as f64));
        trace.extend_from_slice(&cas[head..]);
        let structure = backbone(&trace, "GLY");
        SearchOutcome::from_hits(vec![RawLoop {
            sequence: structure.sequence(),
            source: StructureSource::from(structure),
            rmsd: Some(0.3),
        }])
    }
}

/// Puts every loop into one cluster centred on the first.
pub struct SingleClusterer;

impl LoopClusterer for SingleClusterer {
    fn cluster(&mut self, loops: &[RawLoop], _length: usize) -> SearchOutcome<RawCluster> {
        if loops.is_empty() {
            return SearchOutcome::from_hits(vec![]);
        }
        SearchOutcome::from_hits(vec![RawCluster {
            members: (0..loops.len()).collect(),
            centroid: 0,
        }])
    }
}
