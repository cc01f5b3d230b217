//! # Workflows Module
//!
//! Top-level entry points of the library.
//!
//! - **Build Workflow** ([`build`]) - Grow a seed or query structure with searched
//!   fragments and close every complete fragment set with loops.
//! - **Loop-Seed Workflow** ([`loop_seed`]) - Treat the seed as complete and only build
//!   the loops between its chains.
//!
//! Both take their collaborators as trait objects, so the same workflows run against
//! external search programs or in-process implementations.

pub mod build;
pub mod loop_seed;
