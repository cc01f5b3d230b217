use super::structure::Structure;
use nalgebra::Point3;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// An immutable, named piece of structure taking part in an assembly.
///
/// Fragments are produced by the fragment search (or split off a seed) and are never
/// modified afterwards. Cloning is cheap: the coordinates are shared. Two fragments
/// are the same fragment iff their names match.
#[derive(Debug, Clone)]
pub struct Fragment {
    name: String,
    structure: Arc<Structure>,
    key_residues: Arc<BTreeSet<usize>>,
}

impl Fragment {
    pub fn new(name: impl Into<String>, structure: impl Into<Arc<Structure>>) -> Self {
        Self {
            name: name.into(),
            structure: structure.into(),
            key_residues: Arc::new(BTreeSet::new()),
        }
    }

    /// Returns a copy carrying the given residue indices (0-based, in residue order) as
    /// key residues whose side chains are retained for clash testing.
    pub fn with_key_residues(mut self, key_residues: BTreeSet<usize>) -> Self {
        self.key_residues = Arc::new(key_residues);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn shared_structure(&self) -> Arc<Structure> {
        Arc::clone(&self.structure)
    }

    pub fn key_residues(&self) -> &BTreeSet<usize> {
        &self.key_residues
    }

    pub fn residue_count(&self) -> usize {
        self.structure.residue_count()
    }

    /// The N-terminal connection point: the `N` atom of the first residue, or its `CA`.
    pub fn n_terminus(&self) -> Option<Point3<f64>> {
        let first = *self.structure.ordered_residue_ids().first()?;
        self.structure
            .atom_position(first, "N")
            .or_else(|| self.structure.atom_position(first, "CA"))
    }

    /// The C-terminal connection point: the `C` atom of the last residue, or its `CA`.
    pub fn c_terminus(&self) -> Option<Point3<f64>> {
        let last = *self.structure.ordered_residue_ids().last()?;
        self.structure
            .atom_position(last, "C")
            .or_else(|| self.structure.atom_position(last, "CA"))
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Fragment {}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} residues)", self.name, self.residue_count())
    }
}
