//! # Engine Module
//!
//! The stateful search that turns rigid fragments into complete structures.
//!
//! ## Overview
//!
//! Growth starts from a seed and adds one searched fragment per recursion level
//! ([`orchestrator`]). Whenever the budget is exhausted and the termini of the fragment
//! set can be chained ([`termini`], [`topology`]), the loop path ([`loops`]) asks the
//! loop search for connecting segments, ranks their clusters ([`ranking`]) and
//! validates combinations ([`validation`]) until a stitched ([`stitching`]) structure
//! survives every screen.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Assembly parameters and their builder
//! - **Collaborators** ([`search`], [`services`]) - Search and clustering contracts and
//!   their process-backed implementations
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! External collaborators never fail the run: an empty or failed search only ends
//! the branch that issued it.

pub mod cache;
pub mod config;
pub mod error;
pub mod loops;
pub mod orchestrator;
pub mod progress;
pub mod ranking;
pub mod search;
pub mod services;
pub mod stitching;
pub mod termini;
pub mod topology;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
