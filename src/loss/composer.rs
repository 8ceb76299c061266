use candle_core::{D, DType, Tensor};
use tracing::debug;

use crate::config::TrainConfig;
use crate::constants::RANKING_MARGIN;

use super::error::LossError;

/// Positive (diagonal) and hardest in-batch negative score for each row.
#[derive(Debug, Clone)]
pub struct PositiveNegative {
    /// `[B]`, entry `i` is `scores[i, i]`.
    pub positives: Tensor,
    /// `[B]`, entry `i` is `max_{j != i} scores[i, j]`.
    pub negatives: Tensor,
}

/// Scalar loss for one batch plus its components for logging.
#[derive(Debug, Clone)]
pub struct LossBreakdown {
    /// Differentiable combined loss.
    pub total: Tensor,
    pub total_value: f32,
    pub ranking: f32,
    pub distillation: f32,
}

/// Returns `(rows, cols)` after checking the matrix is square with `B >= 2`.
fn square_dims(scores: &Tensor) -> Result<usize, LossError> {
    let (rows, cols) = scores.dims2()?;
    if rows != cols {
        return Err(LossError::NotSquare { rows, cols });
    }
    if rows < 2 {
        return Err(LossError::DegenerateBatch { batch_size: rows });
    }
    Ok(rows)
}

/// Extracts positives and hardest negatives without touching `scores`.
///
/// The diagonal is masked to `-inf` on a fresh tensor before the row max, so
/// row `i` can never pick itself as its own negative.
pub fn extract_positive_negative(scores: &Tensor) -> Result<PositiveNegative, LossError> {
    let batch_size = square_dims(scores)?;
    let device = scores.device();
    let scores = scores.to_dtype(DType::F32)?;

    let diagonal = Tensor::eye(batch_size, DType::U8, device)?;
    let positives = scores
        .mul(&diagonal.to_dtype(DType::F32)?)?
        .sum(D::Minus1)?;

    let neg_inf = Tensor::full(f32::NEG_INFINITY, (batch_size, batch_size), device)?;
    let masked = diagonal.where_cond(&neg_inf, &scores)?;
    let negatives = masked.max(D::Minus1)?;

    Ok(PositiveNegative {
        positives,
        negatives,
    })
}

/// `mean_i max(0, margin - (pos_i - neg_i))` over the hardest in-batch negatives.
pub fn ranking_loss(scores: &Tensor, margin: f64) -> Result<Tensor, LossError> {
    let PositiveNegative {
        positives,
        negatives,
    } = extract_positive_negative(scores)?;

    Ok((negatives - positives)?
        .affine(1.0, margin)?
        .relu()?
        .mean_all()?)
}

/// Row-wise log-softmax of `scores / temperature`, on the unmasked matrix.
pub fn distill_log_probs(scores: &Tensor, temperature: f64) -> Result<Tensor, LossError> {
    let scaled = scores.to_dtype(DType::F32)?.affine(1.0 / temperature, 0.0)?;
    Ok(candle_nn::ops::log_softmax(&scaled, D::Minus1)?)
}

/// Batch-mean `KL(teacher || student)` over the rows of the two score matrices.
///
/// Teacher scores are detached, so no gradient reaches the teacher.
pub fn distillation_loss(
    teacher_scores: &Tensor,
    student_scores: &Tensor,
    temperature: f64,
) -> Result<Tensor, LossError> {
    let teacher_dims = teacher_scores.dims2()?;
    let student_dims = student_scores.dims2()?;
    if teacher_dims != student_dims {
        return Err(LossError::ShapeMismatch {
            teacher: teacher_dims,
            student: student_dims,
        });
    }

    let teacher_log = distill_log_probs(&teacher_scores.detach(), temperature)?;
    let student_log = distill_log_probs(student_scores, temperature)?;
    let teacher_probs = teacher_log.exp()?;

    let kl = teacher_probs
        .mul(&(teacher_log - student_log)?)?
        .sum_all()?
        .affine(1.0 / teacher_dims.0 as f64, 0.0)?;
    Ok(kl)
}

/// Blends the ranking and distillation objectives: `alpha * rank + (1 - alpha) * distill`.
///
/// Stateless; every call depends only on its arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossComposer {
    alpha: f64,
    temperature: f64,
    margin: f64,
}

impl Default for LossComposer {
    fn default() -> Self {
        let config = TrainConfig::default();
        Self::new(config.alpha, config.temperature)
    }
}

impl LossComposer {
    pub fn new(alpha: f64, temperature: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&alpha),
            "alpha must be between 0.0 and 1.0"
        );
        assert!(temperature > 0.0, "temperature must be greater than 0.0");
        Self {
            alpha,
            temperature,
            margin: RANKING_MARGIN,
        }
    }

    /// Builds a composer from an already validated config.
    pub fn from_config(config: &TrainConfig) -> Self {
        Self::new(config.alpha, config.temperature).with_margin(config.margin)
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Combined training loss for one batch.
    ///
    /// Fails with [`LossError::DegenerateBatch`] for `B < 2` and
    /// [`LossError::NonFiniteLoss`] when the result must not be trained on.
    pub fn compose(
        &self,
        teacher_scores: &Tensor,
        student_scores: &Tensor,
    ) -> Result<LossBreakdown, LossError> {
        square_dims(student_scores)?;

        let distillation = distillation_loss(teacher_scores, student_scores, self.temperature)?;
        let ranking = ranking_loss(student_scores, self.margin)?;

        let total = (ranking.affine(self.alpha, 0.0)?
            + distillation.affine(1.0 - self.alpha, 0.0)?)?;

        let ranking_value = ranking.to_scalar::<f32>()?;
        let distillation_value = distillation.to_scalar::<f32>()?;
        let total_value = total.to_scalar::<f32>()?;

        if !total_value.is_finite() {
            return Err(LossError::NonFiniteLoss {
                ranking: ranking_value,
                distillation: distillation_value,
            });
        }

        debug!(
            total = total_value,
            ranking = ranking_value,
            distillation = distillation_value,
            "Composed loss"
        );

        Ok(LossBreakdown {
            total,
            total_value,
            ranking: ranking_value,
            distillation: distillation_value,
        })
    }

    /// Ranking component only, as used for validation.
    pub fn ranking_only(&self, student_scores: &Tensor) -> Result<f32, LossError> {
        let value = ranking_loss(student_scores, self.margin)?.to_scalar::<f32>()?;
        if !value.is_finite() {
            return Err(LossError::NonFiniteLoss {
                ranking: value,
                distillation: 0.0,
            });
        }
        Ok(value)
    }
}
