//! Collaborator implementations shipped with the engine: external search programs
//! driven through the command line, and a built-in loop clusterer.

pub mod clustering;
pub mod command;
