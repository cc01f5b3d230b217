//! Geometric predicates evaluated on assembled or candidate structures.
//!
//! - [`clash`] - Heavy-atom steric clash test over a set of structures
//! - [`gaps`] - Missing-residue (chain break) detection
//! - [`compactness`] - Scalar compactness metric used to gate final assemblies

pub mod clash;
pub mod compactness;
pub mod gaps;
