use candle_core::backprop::GradStore;
use candle_core::{DType, Device, Var};
use candle_nn::optim::{AdamW, Optimizer, ParamsAdamW};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::TrainConfig;
use crate::constants::{ADAM_EPSILON, WEIGHT_DECAY};
use crate::dataset::{BatchLoader, PairBatch, PairedDataset};
use crate::loss::{LossBreakdown, LossComposer, LossError};
use crate::scoring::DualEncoderScorer;

use super::error::TrainingError;
use super::evaluator::Evaluator;
use super::report::{EpochSummary, TrainingReport};
use super::schedule::LinearSchedule;

/// Per-epoch bookkeeping; reset at the start of every epoch.
#[derive(Debug, Default)]
struct EpochState {
    running_loss: f64,
    applied: usize,
    skipped: usize,
}

impl EpochState {
    fn average_loss(&self) -> Option<f32> {
        (self.applied > 0).then(|| (self.running_loss / self.applied as f64) as f32)
    }
}

/// Outcome of one batch step.
enum StepOutcome {
    Applied(LossBreakdown),
    Skipped,
}

/// Distils a frozen teacher into a trainable student.
pub struct Trainer<'m> {
    teacher: &'m DualEncoderScorer,
    student: &'m DualEncoderScorer,
    composer: LossComposer,
    config: TrainConfig,
    device: Device,
    quiet: bool,
}

impl<'m> Trainer<'m> {
    /// Validates `config` and checks the student has parameters to update.
    pub fn new(
        teacher: &'m DualEncoderScorer,
        student: &'m DualEncoderScorer,
        config: &TrainConfig,
        device: &Device,
    ) -> Result<Self, TrainingError> {
        config.validate()?;

        if student.trainable_vars().is_empty() {
            return Err(TrainingError::StudentNotTrainable {
                identifier: student.query_encoder().identifier().to_string(),
            });
        }

        Ok(Self {
            teacher,
            student,
            composer: LossComposer::from_config(config),
            config: config.clone(),
            device: device.clone(),
            quiet: false,
        })
    }

    /// Hides the progress bar.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn composer(&self) -> &LossComposer {
        &self.composer
    }

    /// Runs every configured epoch, evaluating on `validation` after each one.
    pub fn train(
        &self,
        train: &PairedDataset,
        validation: &PairedDataset,
    ) -> Result<TrainingReport, TrainingError> {
        if train.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let mut train_loader =
            BatchLoader::shuffled(train, self.config.batch_size, self.config.seed, &self.device);
        let mut validation_loader =
            BatchLoader::sequential(validation, self.config.batch_size, &self.device);

        let batches_per_epoch = train_loader.num_batches();
        let schedule = LinearSchedule::new(
            self.config.learning_rate,
            self.config.warmup_steps,
            self.config.total_steps(batches_per_epoch),
        );

        let vars = self.student.trainable_vars();
        let mut optimizer = AdamW::new(vars.clone(), optimizer_params(schedule.lr_at(0)))?;
        let evaluator = Evaluator::new(self.composer);

        info!(
            train_examples = train.len(),
            validation_examples = validation.len(),
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            batches_per_epoch,
            total_steps = schedule.total_steps(),
            lr = self.config.learning_rate,
            alpha = self.composer.alpha(),
            temperature = self.composer.temperature(),
            "Training started"
        );

        let progress = self.progress_bar(schedule.total_steps() as u64);
        let mut report = TrainingReport::default();
        let mut global_step = 0usize;

        for epoch in 1..=self.config.epochs {
            let mut state = EpochState::default();

            for batch in train_loader.epoch() {
                let batch = batch?;

                match self.step(&batch, &vars, &mut optimizer, epoch)? {
                    StepOutcome::Applied(loss) => {
                        global_step += 1;
                        optimizer.set_learning_rate(schedule.lr_at(global_step));

                        state.running_loss += f64::from(loss.total_value);
                        state.applied += 1;

                        debug!(
                            epoch,
                            batch = batch.index,
                            step = global_step,
                            loss = loss.total_value,
                            ranking = loss.ranking,
                            distillation = loss.distillation,
                            lr = optimizer.learning_rate(),
                            "Batch step"
                        );
                        progress.set_message(format!(
                            "epoch {}/{} loss {:.4}",
                            epoch, self.config.epochs, loss.total_value
                        ));
                    }
                    StepOutcome::Skipped => state.skipped += 1,
                }
                progress.inc(1);
            }

            let train_loss = state.average_loss();
            info!(
                epoch,
                epochs = self.config.epochs,
                loss = train_loss.unwrap_or(f32::NAN),
                applied = state.applied,
                skipped = state.skipped,
                "Epoch complete"
            );

            let validation = evaluator.evaluate(self.student, &mut validation_loader)?;

            report.skipped_batches += state.skipped;
            report.epochs.push(EpochSummary {
                epoch,
                train_loss,
                applied_steps: state.applied,
                skipped_batches: state.skipped,
                learning_rate: optimizer.learning_rate(),
                validation,
            });
        }

        report.global_steps = global_step;
        progress.finish_with_message(format!(
            "Training complete ({} steps, {} skipped)",
            report.global_steps, report.skipped_batches
        ));

        Ok(report)
    }

    /// Forward both models, compose the loss and update the student.
    ///
    /// Batches with a degenerate or non-finite loss, or non-finite gradients,
    /// are reported and leave the parameters untouched.
    fn step(
        &self,
        batch: &PairBatch,
        vars: &[Var],
        optimizer: &mut AdamW,
        epoch: usize,
    ) -> Result<StepOutcome, TrainingError> {
        let loss = match self.batch_loss(batch) {
            Ok(loss) => loss,
            Err(TrainingError::Loss(err)) if err.is_recoverable() => {
                let (ranking, distillation) = match &err {
                    LossError::NonFiniteLoss {
                        ranking,
                        distillation,
                    } => (*ranking, *distillation),
                    _ => (f32::NAN, f32::NAN),
                };
                warn!(
                    epoch,
                    batch = batch.index,
                    batch_size = batch.len(),
                    ranking,
                    distillation,
                    error = %err,
                    "Skipping batch"
                );
                return Ok(StepOutcome::Skipped);
            }
            Err(err) => return Err(err),
        };

        let grads = loss.total.backward()?;
        if !gradients_finite(&grads, vars)? {
            warn!(
                epoch,
                batch = batch.index,
                batch_size = batch.len(),
                ranking = loss.ranking,
                distillation = loss.distillation,
                "Skipping batch with non-finite gradients"
            );
            return Ok(StepOutcome::Skipped);
        }

        optimizer.step(&grads)?;
        Ok(StepOutcome::Applied(loss))
    }

    fn batch_loss(&self, batch: &PairBatch) -> Result<LossBreakdown, TrainingError> {
        let teacher_scores = self
            .teacher
            .score(&batch.queries, &batch.documents)?
            .detach();
        let student_scores = self.student.score(&batch.queries, &batch.documents)?;

        Ok(self.composer.compose(&teacher_scores, &student_scores)?)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .map(|s| s.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message("Student training");
        pb
    }
}

/// AdamW settings for the student: no weight decay, `eps = 1e-6`.
pub(super) fn optimizer_params(lr: f64) -> ParamsAdamW {
    ParamsAdamW {
        lr,
        eps: ADAM_EPSILON,
        weight_decay: WEIGHT_DECAY,
        ..Default::default()
    }
}

/// False if any variable received a NaN or infinite gradient.
pub(super) fn gradients_finite(grads: &GradStore, vars: &[Var]) -> Result<bool, TrainingError> {
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            let sum = grad
                .abs()?
                .sum_all()?
                .to_dtype(DType::F32)?
                .to_scalar::<f32>()?;
            if !sum.is_finite() {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
