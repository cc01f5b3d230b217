use super::ids::ResidueId;
use crate::core::utils::identifiers::one_letter_code;
use std::fmt;

/// Whether a chain is built from amino acids.
///
/// Only protein chains carry backbone atoms the assembly can connect; anything else
/// (ligands, waters, nucleic acids) is kept for clash tests only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainType {
    #[default]
    Protein,
    Other,
}

impl ChainType {
    /// Classifies a chain by the name of its first residue.
    pub fn for_residue(residue_name: &str) -> Self {
        if one_letter_code(residue_name).is_some() {
            ChainType::Protein
        } else {
            ChainType::Other
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainType::Protein => "protein",
            ChainType::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: char,
    pub chain_type: ChainType,
    /// Residues in sequence order.
    pub(crate) residues: Vec<ResidueId>,
}

impl Chain {
    pub(crate) fn new(id: char, chain_type: ChainType) -> Self {
        Self {
            id,
            chain_type,
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}
