use crate::core::models::structure::Structure;

/// Detects chain breaks: a residue without `CA`, or consecutive `CA` atoms of the
/// same chain further apart than `max_ca_gap`.
pub fn has_structural_gap(structure: &Structure, max_ca_gap: f64) -> bool {
    for (_, chain) in structure.chains_iter() {
        let mut previous = None;
        for &residue_id in chain.residues() {
            let Some(ca) = structure.atom_position(residue_id, "CA") else {
                return true;
            };
            if let Some(prev) = previous {
                if nalgebra::distance(&prev, &ca) > max_ca_gap {
                    return true;
                }
            }
            previous = Some(ca);
        }
    }
    false
}
