//! Loss composition for distillation training.
//!
//! Two objectives are computed from a pair of `B×B` score matrices:
//!
//! - **Ranking**: margin hinge between each diagonal positive and its hardest
//!   in-batch negative. Negatives come from a diagonal-masked copy of the
//!   student matrix.
//! - **Distillation**: KL divergence between the row-wise softmax
//!   distributions of the teacher and student matrices at a temperature.
//!   This uses the *unmasked* matrices.
//!
//! [`LossComposer`] blends the two with `alpha`. Every function here is pure;
//! nothing mutates its inputs.

pub mod composer;
pub mod error;

#[cfg(test)]
mod tests;

pub use composer::{
    LossBreakdown, LossComposer, PositiveNegative, distill_log_probs, distillation_loss,
    extract_positive_negative, ranking_loss,
};
pub use error::LossError;
