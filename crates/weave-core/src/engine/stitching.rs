use super::error::EngineError;
use crate::core::models::atom::AtomRole;
use crate::core::models::chain::ChainType;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::any_within;
use crate::core::utils::identifiers::is_clash_core_atom;
use nalgebra::Point3;

#[derive(Debug, Clone)]
pub struct StitchOutcome {
    pub structure: Structure,
    /// Whether two pieces ended up in steric contact.
    pub clashing: bool,
}

/// Joins fragments and loops into one continuous chain.
///
/// Items alternate `fragment, loop, fragment, ...`. Fragments are kept whole; the
/// loop between fragments `j` and `j + 1` loses `overlaps[j].0` residues at its start
/// and `overlaps[j].1` at its end, which duplicate the fragment termini.
#[derive(Debug, Clone, Copy)]
pub struct Stitcher {
    clash_distance: f64,
    min_separation: usize,
}

impl Stitcher {
    pub fn new(clash_distance: f64, min_separation: usize) -> Self {
        Self {
            clash_distance,
            min_separation,
        }
    }

    /// Builds the joined structure as chain `A`, residues renumbered from 1.
    ///
    /// Residues from different items that are at least `min_separation` apart in the
    /// joined sequence and have backbone or `CB` atoms closer than the clash distance
    /// make the outcome `clashing`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stitch`] if the item and overlap counts do not describe
    /// an alternating fragment/loop sequence.
    pub fn stitch(
        &self,
        items: &[&Structure],
        overlaps: &[(usize, usize)],
    ) -> Result<StitchOutcome, EngineError> {
        if items.len() % 2 == 0 {
            return Err(EngineError::Stitch(format!(
                "expected an odd number of items (fragment, loop, ..., fragment), got {}",
                items.len()
            )));
        }
        if overlaps.len() != items.len() / 2 {
            return Err(EngineError::Stitch(format!(
                "{} loops require {} overlap pairs, got {}",
                items.len() / 2,
                items.len() / 2,
                overlaps.len()
            )));
        }

        let mut structure = Structure::new();
        let chain_id = structure.add_chain('A', ChainType::Protein);
        let mut pieces: Vec<usize> = Vec::new();
        let mut cores: Vec<Vec<Point3<f64>>> = Vec::new();
        let mut number: isize = 1;

        for (piece, item) in items.iter().enumerate() {
            let residues = item.ordered_residue_ids();
            let kept = if piece % 2 == 0 {
                &residues[..]
            } else {
                let (head, tail) = overlaps[piece / 2];
                let start = head.min(residues.len());
                let end = residues.len().saturating_sub(tail).max(start);
                &residues[start..end]
            };
            for &residue_id in kept {
                structure
                    .copy_residue_as(chain_id, item, residue_id, number)
                    .ok_or_else(|| EngineError::Internal("residue vanished while stitching".into()))?;
                cores.push(
                    item.residue_atoms(residue_id)
                        .filter(|a| a.role != AtomRole::Hydrogen && is_clash_core_atom(&a.name))
                        .map(|a| a.position)
                        .collect(),
                );
                pieces.push(piece);
                number += 1;
            }
        }

        let clashing = self.has_interpiece_clash(&pieces, &cores);
        Ok(StitchOutcome {
            structure,
            clashing,
        })
    }

    fn has_interpiece_clash(&self, pieces: &[usize], cores: &[Vec<Point3<f64>>]) -> bool {
        let n = cores.len();
        for i in 0..n {
            for j in (i + self.min_separation.max(1))..n {
                if pieces[i] != pieces[j] && any_within(&cores[i], &cores[j], self.clash_distance) {
                    return true;
                }
            }
        }
        false
    }
}
