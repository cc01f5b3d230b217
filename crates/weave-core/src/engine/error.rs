use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::pdb::PdbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Structure I/O failed: {source}")]
    Structure {
        #[from]
        source: PdbError,
    },

    #[error("Invalid topology {order:?}: {reason}")]
    InvalidTopology { order: Vec<usize>, reason: String },

    #[error("Stitching failed: {0}")]
    Stitch(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
