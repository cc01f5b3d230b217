use serde::Deserialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// How many of the available alternatives a search step explores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Breadth {
    /// Only the best-ranked alternative.
    #[default]
    First,
    /// Every alternative, in rank order.
    All,
    /// At most `n` alternatives, in rank order.
    Top(usize),
}

impl Breadth {
    /// Number of alternatives to explore out of `available`.
    pub fn limit(&self, available: usize) -> usize {
        match self {
            Breadth::First => available.min(1),
            Breadth::All => available,
            Breadth::Top(n) => available.min(*n),
        }
    }
}

impl FromStr for Breadth {
    type Err = ConfigError;

    /// Parses `first`, `all` or a positive count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Breadth::First),
            "all" => Ok(Breadth::All),
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Breadth::Top(n)),
                _ => Err(ConfigError::InvalidValue {
                    parameter: "breadth",
                    reason: format!("expected 'first', 'all' or a positive count, got '{}'", s),
                }),
            },
        }
    }
}

impl TryFrom<String> for Breadth {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Breadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breadth::First => write!(f, "first"),
            Breadth::All => write!(f, "all"),
            Breadth::Top(n) => write!(f, "{}", n),
        }
    }
}

/// Which member stands in for a loop cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum RepresentativePolicy {
    /// The cluster centroid reported by the clustering service.
    Centroid,
    /// The member with the lowest search RMSD.
    #[default]
    LowestRmsd,
}

impl FromStr for RepresentativePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "centroid" => Ok(RepresentativePolicy::Centroid),
            "lowest-rmsd" | "lowest_rmsd" | "rmsd" => Ok(RepresentativePolicy::LowestRmsd),
            _ => Err(ConfigError::InvalidValue {
                parameter: "representative",
                reason: format!("expected 'centroid' or 'lowest-rmsd', got '{}'", s),
            }),
        }
    }
}

impl TryFrom<String> for RepresentativePolicy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which quantity the early-pruning rule compares against the satisfied termini count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PruneRule {
    /// Abandon a branch when `remaining - 1 > satisfied`.
    #[default]
    RemainingBudget,
    /// Abandon a branch when `iterations - remaining - 1 > satisfied`, i.e. compare the
    /// budget already consumed.
    ConsumedBudget,
}

impl PruneRule {
    pub fn should_prune(&self, total: usize, remaining: usize, satisfied: usize) -> bool {
        let bound = match self {
            PruneRule::RemainingBudget => remaining as i64 - 1,
            PruneRule::ConsumedBudget => total as i64 - remaining as i64 - 1,
        };
        bound > satisfied as i64
    }
}

/// Parameters forwarded to the fragment search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSearchParams {
    pub rmsd_cutoff: f64,
    pub window: usize,
    pub window_rmsd: f64,
    pub top_n: usize,
    pub secondary_structure: Option<String>,
    pub min_neighbors: usize,
}

impl Default for FragmentSearchParams {
    fn default() -> Self {
        Self {
            rmsd_cutoff: 1.0,
            window: 10,
            window_rmsd: 1.5,
            top_n: 10,
            secondary_structure: None,
            min_neighbors: 1,
        }
    }
}

/// Parameters forwarded to the loop search engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSearchParams {
    pub rmsd_cutoff: f64,
    pub top_n: usize,
}

impl Default for LoopSearchParams {
    fn default() -> Self {
        Self {
            rmsd_cutoff: 1.0,
            top_n: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub lengths: RangeInclusive<usize>,
    pub search: LoopSearchParams,
    pub overlap_window: f64,
    pub key_residue_fraction: f64,
    pub clusters_per_length: usize,
    pub representative: RepresentativePolicy,
}

/// Compactness thresholds; both gates are skipped when screening is disabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactnessGate {
    /// A grown fragment set must score strictly above this before loops are built.
    pub pre_loop_min: f64,
    /// A stitched assembly scoring below this is rejected.
    pub final_min: f64,
}

impl Default for CompactnessGate {
    fn default() -> Self {
        Self {
            pre_loop_min: 0.1,
            final_min: 0.138,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningConfig {
    pub clash_distance: f64,
    pub stitch_min_separation: usize,
    pub max_ca_gap: f64,
    pub compactness: Option<CompactnessGate>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            clash_distance: 2.5,
            stitch_min_separation: 3,
            max_ca_gap: 4.5,
            compactness: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyConfig {
    pub num_iterations: usize,
    pub max_terminus_distance: f64,
    pub adjacency_threshold: f64,
    pub candidate_breadth: Breadth,
    pub seed_group_breadth: Breadth,
    pub prune_rule: PruneRule,
    pub fragment_search: FragmentSearchParams,
    pub loops: LoopConfig,
    pub screening: ScreeningConfig,
}

#[derive(Default)]
pub struct AssemblyConfigBuilder {
    num_iterations: Option<usize>,
    max_terminus_distance: Option<f64>,
    loop_lengths: Option<(usize, usize)>,
    adjacency_threshold: Option<f64>,
    candidate_breadth: Option<Breadth>,
    seed_group_breadth: Option<Breadth>,
    prune_rule: Option<PruneRule>,
    fragment_search: Option<FragmentSearchParams>,
    loop_search: Option<LoopSearchParams>,
    overlap_window: Option<f64>,
    key_residue_fraction: Option<f64>,
    clusters_per_length: Option<usize>,
    representative: Option<RepresentativePolicy>,
    screening: Option<ScreeningConfig>,
}

impl AssemblyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_iterations(mut self, n: usize) -> Self {
        self.num_iterations = Some(n);
        self
    }
    pub fn max_terminus_distance(mut self, distance: f64) -> Self {
        self.max_terminus_distance = Some(distance);
        self
    }
    pub fn loop_lengths(mut self, min: usize, max: usize) -> Self {
        self.loop_lengths = Some((min, max));
        self
    }
    pub fn adjacency_threshold(mut self, distance: f64) -> Self {
        self.adjacency_threshold = Some(distance);
        self
    }
    pub fn candidate_breadth(mut self, breadth: Breadth) -> Self {
        self.candidate_breadth = Some(breadth);
        self
    }
    pub fn seed_group_breadth(mut self, breadth: Breadth) -> Self {
        self.seed_group_breadth = Some(breadth);
        self
    }
    pub fn prune_rule(mut self, rule: PruneRule) -> Self {
        self.prune_rule = Some(rule);
        self
    }
    pub fn fragment_search(mut self, params: FragmentSearchParams) -> Self {
        self.fragment_search = Some(params);
        self
    }
    pub fn loop_search(mut self, params: LoopSearchParams) -> Self {
        self.loop_search = Some(params);
        self
    }
    pub fn overlap_window(mut self, distance: f64) -> Self {
        self.overlap_window = Some(distance);
        self
    }
    pub fn key_residue_fraction(mut self, fraction: f64) -> Self {
        self.key_residue_fraction = Some(fraction);
        self
    }
    pub fn clusters_per_length(mut self, n: usize) -> Self {
        self.clusters_per_length = Some(n);
        self
    }
    pub fn representative(mut self, policy: RepresentativePolicy) -> Self {
        self.representative = Some(policy);
        self
    }
    pub fn screening(mut self, screening: ScreeningConfig) -> Self {
        self.screening = Some(screening);
        self
    }

    pub fn build(self) -> Result<AssemblyConfig, ConfigError> {
        let num_iterations = self
            .num_iterations
            .ok_or(ConfigError::MissingParameter("num_iterations"))?;
        if num_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "num_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        let max_terminus_distance = self
            .max_terminus_distance
            .ok_or(ConfigError::MissingParameter("max_terminus_distance"))?;
        if !(max_terminus_distance > 0.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "max_terminus_distance",
                reason: format!("must be positive, got {}", max_terminus_distance),
            });
        }
        let (min_len, max_len) = self
            .loop_lengths
            .ok_or(ConfigError::MissingParameter("loop_lengths"))?;
        if min_len == 0 || min_len > max_len {
            return Err(ConfigError::InvalidValue {
                parameter: "loop_lengths",
                reason: format!("invalid range {}..={}", min_len, max_len),
            });
        }
        let key_residue_fraction = self.key_residue_fraction.unwrap_or(0.7);
        if !(key_residue_fraction > 0.0 && key_residue_fraction <= 1.0) {
            return Err(ConfigError::InvalidValue {
                parameter: "key_residue_fraction",
                reason: format!("must lie in (0, 1], got {}", key_residue_fraction),
            });
        }
        let clusters_per_length = self.clusters_per_length.unwrap_or(1);
        if clusters_per_length == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "clusters_per_length",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(AssemblyConfig {
            num_iterations,
            max_terminus_distance,
            adjacency_threshold: self.adjacency_threshold.unwrap_or(5.0),
            candidate_breadth: self.candidate_breadth.unwrap_or_default(),
            seed_group_breadth: self.seed_group_breadth.unwrap_or_default(),
            prune_rule: self.prune_rule.unwrap_or_default(),
            fragment_search: self.fragment_search.unwrap_or_default(),
            loops: LoopConfig {
                lengths: min_len..=max_len,
                search: self.loop_search.unwrap_or_default(),
                overlap_window: self.overlap_window.unwrap_or(10.0),
                key_residue_fraction,
                clusters_per_length,
                representative: self.representative.unwrap_or_default(),
            },
            screening: self.screening.unwrap_or_default(),
        })
    }
}
