use super::atom::Atom;
use super::chain::{Chain, ChainType};
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::ops::Range;

const CHAIN_LABELS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Returns the chain identifier used for the `index`-th chain of a merged structure.
///
/// Labels run through `A-Z`, `a-z` and `0-9` and wrap around afterwards.
pub fn chain_label(index: usize) -> char {
    CHAIN_LABELS[index % CHAIN_LABELS.len()] as char
}

/// Represents a complete structure made of chains, residues and atoms.
///
/// Chains keep their insertion order, which is the order used by every iteration
/// helper, by the PDB writer and therefore by byte-level structure comparison.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in insertion order.
    chain_order: Vec<ChainId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
    /// Lookup map for finding residues by chain ID and residue number.
    residue_id_map: HashMap<(ChainId, isize), ResidueId>,
}

impl Structure {
    /// Creates a new, empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a residue by its ID.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Retrieves a chain by its ID.
    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Returns an iterator over all chains in insertion order.
    ///
    /// # Return
    ///
    /// An iterator yielding `(ChainId, &Chain)` pairs.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    /// Finds a chain ID by its single-character identifier.
    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    /// Finds a residue ID by its chain ID and residue number.
    pub fn find_residue_by_number(&self, chain_id: ChainId, number: isize) -> Option<ResidueId> {
        self.residue_id_map.get(&(chain_id, number)).copied()
    }

    /// Adds a new chain to the structure or returns the existing one.
    ///
    /// This method is idempotent; if a chain with the given identifier already exists,
    /// its ID is returned and no duplicate is created.
    ///
    /// # Arguments
    ///
    /// * `id` - The single-character identifier for the chain.
    /// * `chain_type` - The type of the chain.
    ///
    /// # Return
    ///
    /// The ID of the chain (new or existing).
    pub fn add_chain(&mut self, id: char, chain_type: ChainType) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(&id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id, chain_type));
        self.chain_id_map.insert(id, chain_id);
        self.chain_order.push(chain_id);
        chain_id
    }

    /// Adds a new residue to a chain or returns the existing one.
    ///
    /// # Arguments
    ///
    /// * `chain_id` - The ID of the chain to add the residue to.
    /// * `number` - The sequence number of the residue.
    /// * `name` - The three-letter residue name.
    ///
    /// # Return
    ///
    /// Returns `Some(ResidueId)` if successful, `None` if the chain does not exist.
    pub fn add_residue(&mut self, chain_id: ChainId, number: isize, name: &str) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, number);

        let residue_id = *self
            .residue_id_map
            .entry(key)
            .or_insert_with(|| self.residues.insert(Residue::new(number, name, chain_id)));

        if !chain.residues.contains(&residue_id) {
            chain.residues.push(residue_id);
        }
        Some(residue_id)
    }

    /// Adds an atom to an existing residue.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` on success, `None` if the residue does not exist.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        atom.residue_id = residue_id;
        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.residues.get_mut(residue_id)?.add_atom(&name, atom_id);
        Some(atom_id)
    }

    pub fn chain_count(&self) -> usize {
        self.chain_order.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Residue IDs ordered by chain order, then by position within the chain.
    pub fn ordered_residue_ids(&self) -> Vec<ResidueId> {
        self.chains_iter()
            .flat_map(|(_, chain)| chain.residues.iter().copied())
            .collect()
    }

    /// Iterates over the atoms of a residue in insertion order.
    pub fn residue_atoms(&self, residue_id: ResidueId) -> impl Iterator<Item = &Atom> {
        self.residues
            .get(residue_id)
            .map(|residue| residue.atoms.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&atom_id| self.atoms.get(atom_id))
    }

    /// Position of the named atom of a residue, if present.
    pub fn atom_position(&self, residue_id: ResidueId, atom_name: &str) -> Option<Point3<f64>> {
        let atom_id = self.residues.get(residue_id)?.get_atom_id_by_name(atom_name)?;
        self.atoms.get(atom_id).map(|atom| atom.position)
    }

    /// Coordinates of every atom, in chain / residue / atom order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.ordered_residue_ids()
            .into_iter()
            .flat_map(|residue_id| self.residue_atoms(residue_id).map(|atom| atom.position))
            .collect()
    }

    /// CA coordinates of every residue that has a CA atom, in residue order.
    pub fn ca_positions(&self) -> Vec<Point3<f64>> {
        self.ordered_residue_ids()
            .into_iter()
            .filter_map(|residue_id| self.atom_position(residue_id, "CA"))
            .collect()
    }

    /// Three-letter residue names in residue order.
    pub fn sequence(&self) -> Vec<String> {
        self.ordered_residue_ids()
            .into_iter()
            .filter_map(|residue_id| self.residues.get(residue_id).map(|r| r.name.clone()))
            .collect()
    }

    /// Splits the structure into one single-chain structure per chain.
    ///
    /// Chain identifiers and residue numbers are preserved.
    pub fn split_chains(&self) -> Vec<Structure> {
        self.chains_iter()
            .map(|(_, chain)| {
                let mut part = Structure::new();
                let target = part.add_chain(chain.id, chain.chain_type);
                for &residue_id in &chain.residues {
                    part.copy_residue(target, self, residue_id);
                }
                part
            })
            .collect()
    }

    /// Merges several structures into a new one.
    ///
    /// Every chain of every part becomes its own chain in the result, relabelled
    /// sequentially (`A`, `B`, ...) in the order the parts are given.
    pub fn merge(parts: &[&Structure]) -> Structure {
        let mut merged = Structure::new();
        let mut index = 0;
        for part in parts {
            for (_, chain) in part.chains_iter() {
                let target = merged.add_chain(chain_label(index), chain.chain_type);
                for &residue_id in &chain.residues {
                    merged.copy_residue(target, part, residue_id);
                }
                index += 1;
            }
        }
        merged
    }

    /// Returns a copy with `n_trim` residues removed from the N-terminus and `c_trim`
    /// residues removed from the C-terminus of every chain.
    ///
    /// Chains that would become empty are dropped.
    pub fn trimmed(&self, n_trim: usize, c_trim: usize) -> Structure {
        let mut result = Structure::new();
        for (_, chain) in self.chains_iter() {
            let len = chain.residues.len();
            if n_trim + c_trim >= len {
                continue;
            }
            let target = result.add_chain(chain.id, chain.chain_type);
            for &residue_id in &chain.residues[n_trim..len - c_trim] {
                result.copy_residue(target, self, residue_id);
            }
        }
        result
    }

    /// Returns a copy holding only the residues whose ordered index lies in `range`.
    pub fn residue_slice(&self, range: Range<usize>) -> Structure {
        let mut result = Structure::new();
        for (index, residue_id) in self.ordered_residue_ids().into_iter().enumerate() {
            if !range.contains(&index) {
                continue;
            }
            let Some(residue) = self.residues.get(residue_id) else {
                continue;
            };
            let Some(chain) = self.chains.get(residue.chain_id) else {
                continue;
            };
            let target = result.add_chain(chain.id, chain.chain_type);
            result.copy_residue(target, self, residue_id);
        }
        result
    }

    /// Copies a residue of `source` (with all of its atoms) onto the end of `chain_id`,
    /// keeping its residue number.
    pub(crate) fn copy_residue(
        &mut self,
        chain_id: ChainId,
        source: &Structure,
        residue_id: ResidueId,
    ) -> Option<ResidueId> {
        let residue = source.residue(residue_id)?;
        self.copy_residue_as(chain_id, source, residue_id, residue.number)
    }

    /// Copies a residue of `source` onto the end of `chain_id` under a new residue number.
    pub(crate) fn copy_residue_as(
        &mut self,
        chain_id: ChainId,
        source: &Structure,
        residue_id: ResidueId,
        number: isize,
    ) -> Option<ResidueId> {
        let residue = source.residue(residue_id)?;
        let new_residue = self.add_residue(chain_id, number, &residue.name)?;
        for atom in source.residue_atoms(residue_id) {
            self.add_atom_to_residue(new_residue, atom.clone());
        }
        Some(new_residue)
    }
}
