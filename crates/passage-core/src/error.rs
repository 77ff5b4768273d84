use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding model unavailable: {0}")]
    ModelLoad(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Persisted index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Index artifact not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Embedding queue is full ({capacity} pending requests)")]
    ResourceExhausted { capacity: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Missing artifacts put the serving path into degraded mode instead of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::IndexNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
