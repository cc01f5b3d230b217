use super::ids::ResidueId;
use crate::core::utils::identifiers::{is_backbone_atom, is_heavy_atom};
use nalgebra::Point3;
use std::str::FromStr;

/// Represents the role or classification of an atom within a structure.
///
/// The role decides which atoms take part in steric screening: backbone atoms
/// are always considered, side-chain atoms only for retained ("key") residues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AtomRole {
    /// Backbone atom of a polypeptide (N, CA, C, O, OXT).
    Backbone,
    /// Side-chain heavy atom.
    Sidechain,
    /// Hydrogen atom, ignored by all geometric predicates.
    Hydrogen,
    /// Unknown or unclassified atom role.
    #[default]
    Other,
}

impl AtomRole {
    /// Classifies an atom by its PDB atom name.
    ///
    /// # Arguments
    ///
    /// * `atom_name` - The atom name as it appears in the structure file.
    ///
    /// # Return
    ///
    /// The inferred role; names that are neither hydrogens nor backbone atoms are
    /// treated as side-chain atoms.
    pub fn from_atom_name(atom_name: &str) -> Self {
        if !is_heavy_atom(atom_name) {
            AtomRole::Hydrogen
        } else if is_backbone_atom(atom_name) {
            AtomRole::Backbone
        } else if atom_name.trim().is_empty() {
            AtomRole::Other
        } else {
            AtomRole::Sidechain
        }
    }
}

/// Represents an atom in a structure together with the PDB fields preserved on output.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "N", "O").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The role of the atom, derived from its name.
    pub role: AtomRole,
    /// Element symbol (e.g., "C", "N").
    pub element: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Occupancy column of the source record.
    pub occupancy: f64,
    /// Temperature factor column; some search tools store neighbor counts here.
    pub b_factor: f64,
}

impl Atom {
    /// Creates a new `Atom` with its role inferred from the name.
    ///
    /// The element is guessed from the first alphabetic character of the name when
    /// not supplied later; occupancy defaults to 1.0 and the temperature factor to 0.0.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        let trimmed = name.trim();
        Self {
            name: trimmed.to_string(),
            residue_id,
            role: AtomRole::from_atom_name(trimmed),
            element: guess_element(trimmed),
            position,
            occupancy: 1.0,
            b_factor: 0.0,
        }
    }
}

fn guess_element(atom_name: &str) -> String {
    atom_name
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

impl FromStr for AtomRole {
    type Err = ();

    /// Parses a string into an `AtomRole`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backbone" => Ok(AtomRole::Backbone),
            "sidechain" | "side-chain" | "side_chain" => Ok(AtomRole::Sidechain),
            "hydrogen" => Ok(AtomRole::Hydrogen),
            "other" | "unknown" => Ok(AtomRole::Other),
            _ => Err(()),
        }
    }
}
