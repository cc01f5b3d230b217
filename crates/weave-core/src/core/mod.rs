//! # Core Module
//!
//! Stateless building blocks of the assembly engine.
//!
//! ## Overview
//!
//! Everything in this module is a pure function of its inputs: structures are read,
//! queried, split, merged and written, and geometric predicates are evaluated on them,
//! but no search state lives here. The stateful search is in [`crate::engine`].
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atoms, residues, chains, structures and fragments
//! - **File I/O** ([`io`]) - PDB reading and writing, plain or gzip-compressed
//! - **Geometric Predicates** ([`analysis`]) - Clash, structural-gap and compactness tests
//! - **Utilities** ([`utils`]) - Distance helpers and atom/residue name tables

pub mod analysis;
pub mod io;
pub mod models;
pub mod utils;
