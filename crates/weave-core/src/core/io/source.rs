use super::pdb::{PdbError, PdbFile};
use super::traits::StructureFile;
use crate::core::models::structure::Structure;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a structure comes from: already in memory, or a PDB file that is read on demand.
#[derive(Debug, Clone)]
pub enum StructureSource {
    Loaded(Arc<Structure>),
    Path(PathBuf),
}

impl StructureSource {
    /// Returns the structure, reading (and decompressing) it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`PdbError`] if the file cannot be opened or parsed.
    pub fn load(&self) -> Result<Arc<Structure>, PdbError> {
        match self {
            StructureSource::Loaded(structure) => Ok(Arc::clone(structure)),
            StructureSource::Path(path) => read_structure(path).map(Arc::new),
        }
    }

    /// A short name identifying the source: the file name, or `<memory>`.
    pub fn label(&self) -> String {
        match self {
            StructureSource::Loaded(_) => "<memory>".to_string(),
            StructureSource::Path(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("<unnamed>")
                .to_string(),
        }
    }
}

impl From<Structure> for StructureSource {
    fn from(structure: Structure) -> Self {
        StructureSource::Loaded(Arc::new(structure))
    }
}

impl From<PathBuf> for StructureSource {
    fn from(path: PathBuf) -> Self {
        StructureSource::Path(path)
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, PdbError> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        let decoder = GzDecoder::new(BufReader::new(file));
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Reads a PDB file, transparently decompressing `.gz` files.
///
/// # Errors
///
/// Returns [`PdbError`] if the file cannot be opened, decompressed or parsed.
pub fn read_structure(path: &Path) -> Result<Structure, PdbError> {
    let mut reader = open_reader(path)?;
    PdbFile::read_from(&mut reader).map(|(structure, _)| structure)
}
