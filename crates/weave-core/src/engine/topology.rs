use super::error::EngineError;
use super::termini::CompatibilityMatrix;
use itertools::Itertools;
use std::fmt;

/// A connection order over fragment indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topology(Vec<usize>);

impl Topology {
    pub fn new(order: Vec<usize>) -> Self {
        Self(order)
    }

    pub fn order(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consecutive `(from, to)` fragment pairs; one per loop to build.
    pub fn junctions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Whether every junction is reachable under `sat`.
    pub fn is_satisfied_by(&self, sat: &CompatibilityMatrix) -> bool {
        self.junctions().all(|(from, to)| sat.get(from, to))
    }

    fn is_permutation_of(&self, n: usize) -> bool {
        self.0.len() == n && self.0.iter().copied().sorted().eq(0..n)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("->"))
    }
}

/// Result of enumerating orderings over a fragment set.
#[derive(Debug, Clone)]
pub struct TopologyEnumeration {
    /// Number of orderings examined; always `n!`.
    pub considered: usize,
    /// Orderings whose every junction is satisfied, in lexicographic order.
    pub valid: Vec<Topology>,
}

/// Enumerates all orderings of `0..n` and keeps those satisfied by `sat`.
///
/// Orderings are directional: a cycle yields one topology per rotation, and a
/// reflected ordering is only valid if the reverse junctions are satisfied.
pub fn enumerate_topologies(sat: &CompatibilityMatrix) -> TopologyEnumeration {
    let n = sat.size();
    let mut considered = 0;
    let valid = (0..n)
        .permutations(n)
        .inspect(|_| considered += 1)
        .map(Topology::new)
        .filter(|topology| topology.is_satisfied_by(sat))
        .collect();
    TopologyEnumeration { considered, valid }
}

/// Whether at least one ordering is satisfied; stops at the first.
pub fn any_valid_topology(sat: &CompatibilityMatrix) -> bool {
    let n = sat.size();
    (0..n)
        .permutations(n)
        .any(|order| Topology::new(order).is_satisfied_by(sat))
}

/// Validates a caller-supplied order.
///
/// # Return
///
/// `Some(topology)` if the order is satisfied by `sat`, `None` if a junction is not.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTopology`] if `order` is not a permutation of the
/// fragment indices.
pub fn fixed_topology(
    order: &[usize],
    sat: &CompatibilityMatrix,
) -> Result<Option<Topology>, EngineError> {
    let topology = Topology::new(order.to_vec());
    if !topology.is_permutation_of(sat.size()) {
        return Err(EngineError::InvalidTopology {
            order: order.to_vec(),
            reason: format!("expected a permutation of 0..{}", sat.size()),
        });
    }
    Ok(topology.is_satisfied_by(sat).then_some(topology))
}
