use crate::core::models::atom::AtomRole;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::any_within;
use crate::core::utils::identifiers::is_clash_core_atom;
use nalgebra::Point3;
use std::collections::BTreeSet;

/// One participant of a clash test.
///
/// Backbone atoms and `CB` of every residue always take part. Residues listed in
/// `retained` (0-based indices in residue order) contribute all of their heavy atoms.
#[derive(Debug, Clone, Copy)]
pub struct ClashProbe<'a> {
    pub structure: &'a Structure,
    pub retained: Option<&'a BTreeSet<usize>>,
}

impl<'a> ClashProbe<'a> {
    pub fn new(structure: &'a Structure) -> Self {
        Self {
            structure,
            retained: None,
        }
    }

    pub fn with_retained(structure: &'a Structure, retained: &'a BTreeSet<usize>) -> Self {
        Self {
            structure,
            retained: Some(retained),
        }
    }

    /// Coordinates of the atoms this probe contributes.
    pub fn atoms(&self) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for (index, residue_id) in self.structure.ordered_residue_ids().into_iter().enumerate() {
            let keep_all = self.retained.is_some_and(|set| set.contains(&index));
            points.extend(
                self.structure
                    .residue_atoms(residue_id)
                    .filter(|atom| atom.role != AtomRole::Hydrogen)
                    .filter(|atom| keep_all || is_clash_core_atom(&atom.name))
                    .map(|atom| atom.position),
            );
        }
        points
    }
}

/// Whether any two distinct probes have a heavy-atom pair closer than `cutoff`.
pub fn any_clash(probes: &[ClashProbe<'_>], cutoff: f64) -> bool {
    let atoms: Vec<Vec<Point3<f64>>> = probes.iter().map(ClashProbe::atoms).collect();
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            if any_within(&atoms[i], &atoms[j], cutoff) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::StructureBuilder;
    use crate::core::models::chain::ChainType;

    fn residue_at(x: f64, side_chain_offset: f64) -> Structure {
        let mut builder = StructureBuilder::new();
        builder.start_chain('A', ChainType::Protein).start_residue(1, "PHE");
        builder.add_atom("CA", Point3::new(x, 0.0, 0.0), "C", 1.0, 0.0);
        builder.add_atom("CB", Point3::new(x, 1.5, 0.0), "C", 1.0, 0.0);
        builder.add_atom("CZ", Point3::new(x + side_chain_offset, 4.0, 0.0), "C", 1.0, 0.0);
        builder.add_atom("HZ", Point3::new(x + side_chain_offset, 5.0, 0.0), "H", 1.0, 0.0);
        builder.build()
    }

    #[test]
    fn distant_structures_do_not_clash() {
        let a = residue_at(0.0, 0.0);
        let b = residue_at(10.0, 0.0);
        assert!(!any_clash(&[ClashProbe::new(&a), ClashProbe::new(&b)], 2.5));
    }

    #[test]
    fn backbone_contact_is_a_clash() {
        let a = residue_at(0.0, 0.0);
        let b = residue_at(1.0, 0.0);
        assert!(any_clash(&[ClashProbe::new(&a), ClashProbe::new(&b)], 2.5));
    }

    #[test]
    fn side_chains_only_count_when_retained() {
        let a = residue_at(0.0, 5.0);
        let b = residue_at(8.0, -2.0);
        let retained: BTreeSet<usize> = [0].into();
        assert!(!any_clash(&[ClashProbe::new(&a), ClashProbe::new(&b)], 2.5));
        assert!(!any_clash(
            &[ClashProbe::with_retained(&a, &retained), ClashProbe::new(&b)],
            2.5
        ));
        assert!(any_clash(
            &[
                ClashProbe::with_retained(&a, &retained),
                ClashProbe::with_retained(&b, &retained)
            ],
            2.5
        ));
    }

    #[test]
    fn hydrogens_are_ignored() {
        let a = residue_at(0.0, 0.0);
        let retained: BTreeSet<usize> = [0].into();
        let probe = ClashProbe::with_retained(&a, &retained);
        assert_eq!(probe.atoms().len(), 3);
    }

    #[test]
    fn a_single_probe_never_clashes_with_itself() {
        let a = residue_at(0.0, 0.0);
        assert!(!any_clash(&[ClashProbe::new(&a)], 2.5));
    }
}
