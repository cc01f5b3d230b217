use super::atom::Atom;
use super::chain::ChainType;
use super::ids::{ChainId, ResidueId};
use super::structure::Structure;
use nalgebra::Point3;

/// Incrementally assembles a [`Structure`] record by record.
///
/// Used by the file readers and by code that synthesizes structures. Adding a residue
/// before any chain implicitly opens chain `A`; adding an atom before any residue is
/// ignored and reported through the return value.
pub struct StructureBuilder {
    structure: Structure,

    current_chain: Option<ChainId>,
    current_residue: Option<ResidueId>,
}

impl Default for StructureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self {
            structure: Structure::new(),
            current_chain: None,
            current_residue: None,
        }
    }

    pub fn start_chain(&mut self, id: char, chain_type: ChainType) -> &mut Self {
        self.current_chain = Some(self.structure.add_chain(id, chain_type));
        self.current_residue = None;
        self
    }

    pub fn start_residue(&mut self, number: isize, name: &str) -> &mut Self {
        let chain_id = match self.current_chain {
            Some(id) => id,
            None => {
                let id = self.structure.add_chain('A', ChainType::Protein);
                self.current_chain = Some(id);
                id
            }
        };
        self.current_residue = self.structure.add_residue(chain_id, number, name);
        self
    }

    /// Adds an atom to the current residue.
    ///
    /// # Return
    ///
    /// `true` if the atom was added, `false` when no residue has been started.
    pub fn add_atom(
        &mut self,
        name: &str,
        position: Point3<f64>,
        element: &str,
        occupancy: f64,
        b_factor: f64,
    ) -> bool {
        let Some(residue_id) = self.current_residue else {
            return false;
        };
        let mut atom = Atom::new(name, residue_id, position);
        if !element.trim().is_empty() {
            atom.element = element.trim().to_ascii_uppercase();
        }
        atom.occupancy = occupancy;
        atom.b_factor = b_factor;
        self.structure.add_atom_to_residue(residue_id, atom).is_some()
    }

    /// Whether the current residue already holds an atom with this name.
    pub fn has_atom(&self, name: &str) -> bool {
        self.current_residue
            .and_then(|id| self.structure.residue(id))
            .is_some_and(|residue| residue.get_atom_id_by_name(name.trim()).is_some())
    }

    pub fn build(self) -> Structure {
        self.structure
    }
}
