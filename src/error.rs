//! Error types shared by the library and both binaries.
//!
//! Only contract violations and I/O problems surface here. Data-quality
//! issues during tree construction (unknown root, OOV candidates, missing
//! providers) are absorbed by the builder and never become an `Error`.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed build or filter configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of an embedding file could not be parsed.
    #[error("malformed vector file at line {line}: {message}")]
    VectorFormat { line: usize, message: String },

    #[error("vector for '{token}' has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        token: String,
        expected: usize,
        found: usize,
    },

    /// A word list, lemma table or similar line-oriented file is malformed.
    #[error("{path}:{line}: {message}")]
    WordList {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}
