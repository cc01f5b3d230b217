//! Provides input/output functionality for structure files.
//!
//! PDB is the only format handled. Files may be gzip-compressed, which is how the
//! loop database usually stores its candidates. [`source::StructureSource`] lets the
//! engine refer to structures that are only read when they are actually needed.

pub mod pdb;
pub mod source;
pub mod traits;
