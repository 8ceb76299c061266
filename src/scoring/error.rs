use thiserror::Error;

use crate::embedding::EncoderError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("batch size mismatch: {queries} queries vs {documents} documents")]
    ShapeMismatch { queries: usize, documents: usize },

    #[error("scoring computation failed: {reason}")]
    ComputationFailed { reason: String },
}

impl From<candle_core::Error> for ScoringError {
    fn from(err: candle_core::Error) -> Self {
        ScoringError::ComputationFailed {
            reason: err.to_string(),
        }
    }
}
