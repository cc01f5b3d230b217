//! # sseweave
//!
//! Combinatorial assembly of protein structures from rigid secondary-structure
//! fragments and searched loops.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Fragment`), PDB
//!   I/O and the geometric predicates (clashes, gaps, compactness).
//!
//! - **[`engine`]: The Logic Core.** The stateful search: the recursive growth
//!   orchestrator with its pruning rule, topology enumeration over the termini
//!   compatibility matrix, loop ranking, combination validation and stitching.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (`build`, `loop_seed`) that
//!   tie `engine` and `core` together behind a small entry point.

pub mod core;
pub mod engine;
pub mod workflows;
