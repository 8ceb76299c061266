use tracing::{info, warn};

use crate::dataset::BatchLoader;
use crate::loss::LossComposer;
use crate::scoring::DualEncoderScorer;

use super::error::TrainingError;
use super::report::ValidationSummary;

/// Mean ranking loss of a student over held-out batches.
///
/// Reads the student only; the teacher plays no part in validation.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    composer: LossComposer,
}

impl Evaluator {
    pub fn new(composer: LossComposer) -> Self {
        Self { composer }
    }

    pub fn evaluate(
        &self,
        student: &DualEncoderScorer,
        loader: &mut BatchLoader<'_>,
    ) -> Result<ValidationSummary, TrainingError> {
        let mut total = 0.0f64;
        let mut summary = ValidationSummary::default();

        for batch in loader.epoch() {
            let batch = batch?;
            let scores = student.score(&batch.queries, &batch.documents)?.detach();

            match self.composer.ranking_only(&scores) {
                Ok(loss) => {
                    total += f64::from(loss);
                    summary.batches += 1;
                }
                Err(err) if err.is_recoverable() => {
                    warn!(
                        batch = batch.index,
                        batch_size = batch.len(),
                        error = %err,
                        "Skipping validation batch"
                    );
                    summary.skipped_batches += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        if summary.batches > 0 {
            summary.mean_loss = Some((total / summary.batches as f64) as f32);
        }

        info!(
            loss = summary.mean_loss.unwrap_or(f32::NAN),
            batches = summary.batches,
            skipped = summary.skipped_batches,
            "Validation complete"
        );

        Ok(summary)
    }
}
