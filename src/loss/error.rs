use thiserror::Error;

#[derive(Debug, Error)]
pub enum LossError {
    /// Fewer than two pairs in the batch, so no in-batch negative exists.
    #[error("degenerate batch of size {batch_size}: at least 2 pairs are needed for in-batch negatives")]
    DegenerateBatch { batch_size: usize },

    #[error("score matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("teacher scores are {teacher:?} but student scores are {student:?}")]
    ShapeMismatch {
        teacher: (usize, usize),
        student: (usize, usize),
    },

    #[error("non-finite loss (ranking={ranking}, distillation={distillation})")]
    NonFiniteLoss { ranking: f32, distillation: f32 },

    #[error("loss computation failed: {reason}")]
    ComputationFailed { reason: String },
}

impl LossError {
    /// Per-batch anomalies the training loop skips instead of aborting on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LossError::DegenerateBatch { .. } | LossError::NonFiniteLoss { .. }
        )
    }
}

impl From<candle_core::Error> for LossError {
    fn from(err: candle_core::Error) -> Self {
        LossError::ComputationFailed {
            reason: err.to_string(),
        }
    }
}
