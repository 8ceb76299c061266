use std::path::PathBuf;

use thiserror::Error;

use crate::embedding::EncoderError;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("malformed record at {path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("relevance judgment references unknown {kind} id '{id}'")]
    MissingRecord { kind: &'static str, id: String },

    #[error(
        "column lengths differ: {queries} queries, {documents} documents, {labels} labels"
    )]
    LengthMismatch {
        queries: usize,
        documents: usize,
        labels: usize,
    },

    #[error("index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error("batch collation failed: {reason}")]
    Collation { reason: String },
}

impl From<candle_core::Error> for DatasetError {
    fn from(err: candle_core::Error) -> Self {
        DatasetError::Collation {
            reason: err.to_string(),
        }
    }
}
