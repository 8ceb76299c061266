use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::embedding::EncoderError;
use crate::loss::LossError;
use crate::scoring::ScoringError;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Loss(#[from] LossError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error("student model '{identifier}' has no trainable parameters")]
    StudentNotTrainable { identifier: String },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("optimizer step failed: {reason}")]
    Optimizer { reason: String },
}

impl From<candle_core::Error> for TrainingError {
    fn from(err: candle_core::Error) -> Self {
        TrainingError::Optimizer {
            reason: err.to_string(),
        }
    }
}
