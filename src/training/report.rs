use serde::Serialize;

/// Result of one pass over the validation split.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationSummary {
    /// Mean ranking loss over evaluated batches; `None` when none could be evaluated.
    pub mean_loss: Option<f32>,
    pub batches: usize,
    pub skipped_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochSummary {
    /// 1-based.
    pub epoch: usize,
    /// Mean combined loss over the applied steps of the epoch.
    pub train_loss: Option<f32>,
    pub applied_steps: usize,
    pub skipped_batches: usize,
    /// Learning rate after the last step of the epoch.
    pub learning_rate: f64,
    pub validation: ValidationSummary,
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochSummary>,
    pub global_steps: usize,
    pub skipped_batches: usize,
}

impl TrainingReport {
    pub fn final_train_loss(&self) -> Option<f32> {
        self.epochs.last().and_then(|e| e.train_loss)
    }

    pub fn final_validation_loss(&self) -> Option<f32> {
        self.epochs.last().and_then(|e| e.validation.mean_loss)
    }
}
