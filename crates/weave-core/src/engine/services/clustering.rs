use crate::core::utils::geometry::calculate_rmsd;
use crate::engine::search::{LoopClusterer, RawCluster, RawLoop, SearchOutcome};
use nalgebra::Point3;
use tracing::debug;

pub const DEFAULT_CLUSTER_CUTOFF: f64 = 1.0;

/// Greedy leader clustering of loops by CA RMSD, without superposition.
///
/// Loops returned by a loop search are already placed on the query, so their CA
/// traces are compared in place. A loop joins the first cluster whose leader lies
/// within the cutoff, otherwise it leads a new cluster. Loops with a different CA
/// count than their leader never join.
#[derive(Debug, Clone, Copy)]
pub struct LeaderClusterer {
    cutoff: f64,
}

impl Default for LeaderClusterer {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTER_CUTOFF)
    }
}

impl LeaderClusterer {
    pub fn new(cutoff: f64) -> Self {
        Self { cutoff }
    }

    fn traces(loops: &[RawLoop]) -> Result<Vec<Vec<Point3<f64>>>, String> {
        loops
            .iter()
            .map(|raw| {
                raw.source
                    .load()
                    .map(|structure| structure.ca_positions())
                    .map_err(|e| format!("cannot load {}: {}", raw.source.label(), e))
            })
            .collect()
    }
}

/// The member with the smallest summed RMSD to the rest of its cluster.
fn centroid_of(members: &[usize], traces: &[Vec<Point3<f64>>]) -> usize {
    let mut best = members[0];
    let mut best_sum = f64::INFINITY;
    for &candidate in members {
        let sum: f64 = members
            .iter()
            .filter(|&&other| other != candidate)
            .map(|&other| calculate_rmsd(&traces[candidate], &traces[other]).unwrap_or(f64::INFINITY))
            .sum();
        if sum < best_sum {
            best_sum = sum;
            best = candidate;
        }
    }
    best
}

impl LoopClusterer for LeaderClusterer {
    fn cluster(&mut self, loops: &[RawLoop], length: usize) -> SearchOutcome<RawCluster> {
        let traces = match Self::traces(loops) {
            Ok(traces) => traces,
            Err(message) => return SearchOutcome::failed(message),
        };

        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (index, trace) in traces.iter().enumerate() {
            if trace.is_empty() {
                continue;
            }
            let home = groups.iter_mut().find(|group| {
                calculate_rmsd(&traces[group[0]], trace).is_some_and(|rmsd| rmsd <= self.cutoff)
            });
            match home {
                Some(group) => group.push(index),
                None => groups.push(vec![index]),
            }
        }
        debug!(length, loops = loops.len(), clusters = groups.len(), "Clustered loops");

        SearchOutcome::from_hits(
            groups
                .into_iter()
                .map(|members| RawCluster {
                    centroid: centroid_of(&members, &traces),
                    members,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::source::StructureSource;
    use crate::engine::search::EmptyReason;
    use crate::engine::testing::line_segment;
    use std::path::PathBuf;

    fn raw(start: usize, count: usize) -> RawLoop {
        let structure = line_segment(start, count, "GLY");
        RawLoop {
            sequence: structure.sequence(),
            source: StructureSource::from(structure),
            rmsd: None,
        }
    }

    #[test]
    fn near_identical_loops_share_a_cluster() {
        // Two copies at the origin, one shifted by a full residue, one of another length.
        let loops = vec![raw(0, 4), raw(0, 4), raw(1, 4), raw(0, 5)];
        let outcome = LeaderClusterer::new(1.0).cluster(&loops, 4);
        let clusters = outcome.hits();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].members, vec![0, 1]);
        assert_eq!(clusters[1].members, vec![2]);
        assert_eq!(clusters[2].members, vec![3]);
    }

    #[test]
    fn centroid_minimizes_summed_deviation() {
        let loops = vec![raw(0, 3), raw(1, 3), raw(2, 3)];
        let outcome = LeaderClusterer::new(10.0).cluster(&loops, 3);
        let clusters = outcome.hits();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].centroid, 1);
    }

    #[test]
    fn unreadable_loop_fails_the_clustering() {
        let loops = vec![
            raw(0, 3),
            RawLoop {
                source: StructureSource::from(PathBuf::from("/nonexistent/loop.pdb")),
                rmsd: None,
                sequence: Vec::new(),
            },
        ];
        assert!(matches!(
            LeaderClusterer::default().cluster(&loops, 3),
            SearchOutcome::Empty(EmptyReason::Failed(_))
        ));
    }

    #[test]
    fn no_loops_means_no_clusters() {
        assert!(matches!(
            LeaderClusterer::default().cluster(&[], 3),
            SearchOutcome::Empty(EmptyReason::NoMatches)
        ));
    }
}
