use crate::core::io::pdb::PdbError;
use crate::core::io::source::StructureSource;
use crate::core::models::structure::Structure;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies a loop candidate within one validation pass: `(junction, cluster index)`.
pub type CandidateKey = (usize, usize);

/// Materialized loop candidates of one validation pass.
///
/// Each candidate is read from its source at most once while it stays cached. Entries
/// first materialized by the current combination are tracked so a rejected
/// combination can drop exactly what it created.
#[derive(Debug, Default)]
pub struct LoopCache {
    entries: HashMap<CandidateKey, Arc<Structure>>,
    fresh: Vec<CandidateKey>,
    loads: usize,
}

impl LoopCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a new combination.
    pub fn begin_combination(&mut self) {
        self.fresh.clear();
    }

    /// Returns the candidate structure, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PdbError`] if the source cannot be read; nothing is cached then.
    pub fn materialize(
        &mut self,
        key: CandidateKey,
        source: &StructureSource,
    ) -> Result<Arc<Structure>, PdbError> {
        if let Some(structure) = self.entries.get(&key) {
            return Ok(Arc::clone(structure));
        }
        let structure = source.load()?;
        self.loads += 1;
        self.entries.insert(key, Arc::clone(&structure));
        self.fresh.push(key);
        Ok(structure)
    }

    /// Drops every entry materialized since [`begin_combination`](Self::begin_combination).
    pub fn discard_fresh(&mut self) {
        for key in self.fresh.drain(..) {
            self.entries.remove(&key);
        }
    }

    pub fn contains(&self, key: CandidateKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of source reads performed.
    pub fn loads(&self) -> usize {
        self.loads
    }
}
