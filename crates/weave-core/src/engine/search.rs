//! Request/response contracts of the external collaborators: the fragment search
//! engine, the loop search engine and the loop clustering service.
//!
//! Collaborators never return errors to the engine. A failure is reported as
//! [`SearchOutcome::Empty`] with [`EmptyReason::Failed`], which the engine treats
//! exactly like an empty result after logging it.

use super::config::{FragmentSearchParams, LoopSearchParams};
use crate::core::io::source::StructureSource;
use crate::core::models::structure::Structure;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// The collaborator ran but found nothing.
    NoMatches,
    /// The collaborator failed; the message describes why.
    Failed(String),
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::NoMatches => write!(f, "no matches"),
            EmptyReason::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome<T> {
    Found(Vec<T>),
    Empty(EmptyReason),
}

impl<T> SearchOutcome<T> {
    /// Wraps a result list, mapping an empty list to [`EmptyReason::NoMatches`].
    pub fn from_hits(hits: Vec<T>) -> Self {
        if hits.is_empty() {
            SearchOutcome::Empty(EmptyReason::NoMatches)
        } else {
            SearchOutcome::Found(hits)
        }
    }

    pub fn failed(message: impl fmt::Display) -> Self {
        SearchOutcome::Empty(EmptyReason::Failed(message.to_string()))
    }

    pub fn hits(&self) -> &[T] {
        match self {
            SearchOutcome::Found(hits) => hits,
            SearchOutcome::Empty(_) => &[],
        }
    }
}

/// A fragment search request: extend `structure` without entering `exclusion`.
#[derive(Debug, Clone, Copy)]
pub struct FragmentQuery<'a> {
    pub structure: &'a Structure,
    pub exclusion: &'a Structure,
    pub params: &'a FragmentSearchParams,
    /// Set on the first extension of a run; the engine may then require the new
    /// fragment to run antiparallel to the seed.
    pub first_extension: bool,
}

#[derive(Debug, Clone)]
pub struct FragmentHit {
    pub label: String,
    pub structure: Structure,
    pub rmsd: Option<f64>,
}

/// A loop search request for one junction and one loop length.
///
/// `structure` holds the two overlap regions (end of the upstream fragment, start of
/// the downstream fragment); `overlaps` gives their residue counts.
#[derive(Debug, Clone, Copy)]
pub struct LoopQuery<'a> {
    pub structure: &'a Structure,
    pub length: usize,
    pub overlaps: (usize, usize),
    pub params: &'a LoopSearchParams,
}

/// One raw loop match, including its overlap regions.
#[derive(Debug, Clone)]
pub struct RawLoop {
    pub source: StructureSource,
    pub rmsd: Option<f64>,
    /// Three-letter residue names of the matched segment, used for key-residue statistics.
    pub sequence: Vec<String>,
}

/// A cluster of raw loops, as indices into the list handed to the clusterer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCluster {
    pub members: Vec<usize>,
    pub centroid: usize,
}

pub trait FragmentSearch {
    fn search(&mut self, query: &FragmentQuery<'_>) -> SearchOutcome<FragmentHit>;
}

pub trait LoopSearch {
    fn search(&mut self, query: &LoopQuery<'_>) -> SearchOutcome<RawLoop>;
}

pub trait LoopClusterer {
    fn cluster(&mut self, loops: &[RawLoop], length: usize) -> SearchOutcome<RawCluster>;
}
