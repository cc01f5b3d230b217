use super::config::{LoopConfig, RepresentativePolicy};
use super::search::{
    EmptyReason, LoopClusterer, LoopQuery, LoopSearch, RawCluster, RawLoop, SearchOutcome,
};
use crate::core::io::source::StructureSource;
use crate::core::models::structure::Structure;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// A loop cluster ready for validation: its representative, its size and the loop
/// positions whose side chains must be kept for clash testing.
#[derive(Debug, Clone)]
pub struct RankedCluster {
    pub source: StructureSource,
    pub label: String,
    pub length: usize,
    pub member_count: usize,
    pub key_residues: BTreeSet<usize>,
}

/// Collects, clusters and ranks loop candidates for one junction.
pub struct LoopRanker<'t> {
    search: &'t mut dyn LoopSearch,
    clusterer: &'t mut dyn LoopClusterer,
    config: LoopConfig,
    search_calls: usize,
    failures: usize,
}

impl<'t> LoopRanker<'t> {
    pub fn new(
        search: &'t mut dyn LoopSearch,
        clusterer: &'t mut dyn LoopClusterer,
        config: LoopConfig,
    ) -> Self {
        Self {
            search,
            clusterer,
            config,
            search_calls: 0,
            failures: 0,
        }
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls
    }

    /// Searches or clusterings that failed outright, as opposed to finding nothing.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Queries every configured loop length and returns the retained clusters,
    /// largest first.
    ///
    /// Lengths whose search or clustering comes back empty (or fails) contribute
    /// nothing. An empty return value means the junction cannot be closed.
    pub fn rank(&mut self, query: &Structure, overlaps: (usize, usize)) -> Vec<RankedCluster> {
        let mut ranked = Vec::new();

        for length in self.config.lengths.clone() {
            let loop_query = LoopQuery {
                structure: query,
                length,
                overlaps,
                params: &self.config.search,
            };
            self.search_calls += 1;
            let raw = match self.search.search(&loop_query) {
                SearchOutcome::Found(raw) => raw,
                SearchOutcome::Empty(reason) => {
                    self.note_empty("loop search", length, &reason);
                    continue;
                }
            };
            let mut clusters = match self.clusterer.cluster(&raw, length) {
                SearchOutcome::Found(clusters) => clusters,
                SearchOutcome::Empty(reason) => {
                    self.note_empty("loop clustering", length, &reason);
                    continue;
                }
            };

            clusters.retain(|c| !c.members.is_empty());
            clusters.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
            for (rank, cluster) in clusters
                .iter()
                .take(self.config.clusters_per_length)
                .enumerate()
            {
                if let Some(candidate) = self.to_ranked(&raw, cluster, length, rank, overlaps) {
                    ranked.push(candidate);
                }
            }
        }

        ranked.sort_by(|a, b| b.member_count.cmp(&a.member_count));
        debug!(
            clusters = ranked.len(),
            "Ranked loop clusters for junction with overlaps {:?}", overlaps
        );
        ranked
    }

    fn note_empty(&mut self, stage: &str, length: usize, reason: &EmptyReason) {
        match reason {
            EmptyReason::Failed(message) => {
                self.failures += 1;
                warn!(length, "{} failed: {}", stage, message);
            }
            EmptyReason::NoMatches => debug!(length, "{} found nothing", stage),
        }
    }

    fn to_ranked(
        &self,
        raw: &[RawLoop],
        cluster: &RawCluster,
        length: usize,
        rank: usize,
        overlaps: (usize, usize),
    ) -> Option<RankedCluster> {
        let representative = match self.config.representative {
            RepresentativePolicy::Centroid => cluster.centroid,
            RepresentativePolicy::LowestRmsd => lowest_rmsd_member(raw, &cluster.members)?,
        };
        let source = raw.get(representative)?.source.clone();
        let sequences: Vec<&[String]> = cluster
            .members
            .iter()
            .filter_map(|&m| raw.get(m).map(|l| l.sequence.as_slice()))
            .collect();

        Some(RankedCluster {
            label: format!("len{}_c{}_{}", length, rank + 1, source.label()),
            source,
            length,
            member_count: cluster.members.len(),
            key_residues: key_residues(&sequences, overlaps, self.config.key_residue_fraction),
        })
    }
}

/// Member with the smallest RMSD; members without a score rank last, ties keep the
/// earlier member.
fn lowest_rmsd_member(raw: &[RawLoop], members: &[usize]) -> Option<usize> {
    members
        .iter()
        .copied()
        .filter(|&m| m < raw.len())
        .min_by(|&a, &b| {
            let ra = raw[a].rmsd.unwrap_or(f64::INFINITY);
            let rb = raw[b].rmsd.unwrap_or(f64::INFINITY);
            ra.total_cmp(&rb)
        })
}

/// Positions where a single residue type accounts for more than `fraction` of the
/// sequences, restricted to the open interval between the two overlap regions.
///
/// Returns an empty set when the sequences do not share a common length.
pub fn key_residues(
    sequences: &[&[String]],
    overlaps: (usize, usize),
    fraction: f64,
) -> BTreeSet<usize> {
    let Some(first) = sequences.first() else {
        return BTreeSet::new();
    };
    let len = first.len();
    if sequences.iter().any(|s| s.len() != len) {
        return BTreeSet::new();
    }

    let threshold = fraction * sequences.len() as f64;
    let upper = len.saturating_sub(overlaps.1);
    (0..len)
        .filter(|&pos| pos > overlaps.0 && pos < upper)
        .filter(|&pos| {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for seq in sequences {
                *counts.entry(seq[pos].as_str()).or_default() += 1;
            }
            counts.values().copied().max().unwrap_or(0) as f64 > threshold
        })
        .collect()
}
