//! Configuration error types.

use thiserror::Error;

/// Invalid hyperparameters, detected before training starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// `epochs` must be at least one.
    #[error("invalid epochs {value}: must be greater than 0")]
    InvalidEpochs { value: usize },

    /// `batch_size` must be at least one.
    #[error("invalid batch size {value}: must be greater than 0")]
    InvalidBatchSize { value: usize },

    /// `max_length` must be at least one token.
    #[error("invalid max length {value}: must be greater than 0")]
    InvalidMaxLength { value: usize },

    /// Learning rate must be finite and positive.
    #[error("invalid learning rate {value}: must be a finite value greater than 0")]
    InvalidLearningRate { value: f64 },

    /// Temperature must be finite and positive.
    #[error("invalid temperature {value}: must be a finite value greater than 0")]
    InvalidTemperature { value: f64 },

    /// The ranking hinge margin must be finite and non-negative.
    #[error("invalid margin {value}: must be a finite value of at least 0")]
    InvalidMargin { value: f64 },

    /// Alpha weights ranking vs. distillation and must lie in `[0, 1]`.
    #[error("invalid alpha {value}: must be between 0.0 and 1.0")]
    InvalidAlpha { value: f64 },

    /// Fraction of examples kept for training must lie strictly inside `(0, 1)`.
    #[error("invalid train fraction {value}: must be strictly between 0.0 and 1.0")]
    InvalidTrainFraction { value: f64 },

    /// At least one judgment must be kept from the corpus.
    #[error("invalid subset size {value}: must be greater than 0")]
    InvalidSubsetSize { value: usize },

    /// Model identifiers cannot be blank.
    #[error("{field} cannot be empty")]
    EmptyIdentifier { field: &'static str },

    /// Unknown `--device` value.
    #[error("unknown device '{value}': expected one of auto, cpu, cuda, metal")]
    UnknownDevice { value: String },
}
