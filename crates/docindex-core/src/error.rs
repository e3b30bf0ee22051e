use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed document: {0}")]
    Extraction(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Refusing to build an index over zero chunks")]
    EmptyCorpus,

    #[error("Dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corpus has {corpus} segments but index holds {index} vectors")]
    CorpusIndexMismatch { corpus: usize, index: usize },

    #[error("Corpus digest does not match index for generation {generation}")]
    CorpusChecksum { generation: String },

    #[error("Corrupt index artifact {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Invalid chunk at position {position}: {reason}")]
    InvalidChunk { position: usize, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index not built")]
    IndexNotBuilt,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller has to trigger a fresh build instead of retrying.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            Error::EmptyCorpus
                | Error::CorpusIndexMismatch { .. }
                | Error::CorpusChecksum { .. }
                | Error::CorruptIndex { .. }
                | Error::DimensionMismatch { .. }
                | Error::NotFound(_)
                | Error::IndexNotBuilt
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
