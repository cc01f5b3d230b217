//! # Core Models Module
//!
//! This module contains the data structures used to represent the protein pieces
//! handled by the assembly engine.
//!
//! ## Overview
//!
//! A [`structure::Structure`] is an ordered collection of chains, residues and atoms
//! with stable slotmap identifiers. A [`fragment::Fragment`] wraps a structure that has
//! been discovered by a search (or supplied as a seed) and is never modified afterwards;
//! fragments are only referenced, ordered and stitched.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom representation with coordinates and PDB properties
//! - [`residue`] - Residue container with atom-name lookup
//! - [`chain`] - Chain organization and metadata
//! - [`structure`] - Complete structure with splitting, merging and trimming operations
//! - [`builder`] - Incremental construction used by file readers
//! - [`fragment`] - Immutable, named secondary structure element with termini access
//! - [`ids`] - Unique identifier types for atoms, residues, and chains
//!
//! ## Usage
//!
//! ```ignore
//! use sseweave::core::models::builder::StructureBuilder;
//! use nalgebra::Point3;
//!
//! let mut builder = StructureBuilder::new();
//! builder.start_chain('A', ChainType::Protein).start_residue(1, "ALA");
//! builder.add_atom("CA", Point3::new(0.0, 0.0, 0.0), "C", 1.0, 0.0);
//! let structure = builder.build();
//! ```

pub mod atom;
pub mod builder;
pub mod chain;
pub mod fragment;
pub mod ids;
pub mod residue;
pub mod structure;
