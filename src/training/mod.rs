//! Training loop, validation and learning-rate scheduling.
//!
//! A run moves through `Initializing → (epoch → batch steps → evaluation)* →
//! Done`. The teacher is only ever read (its scores are detached); the
//! student is updated by AdamW, and the linear schedule advances once per
//! applied optimizer step. Degenerate or non-finite batches are logged and
//! skipped without touching the student.

pub mod error;
pub mod evaluator;
pub mod report;
pub mod schedule;
pub mod trainer;

#[cfg(test)]
mod tests;

pub use error::TrainingError;
pub use evaluator::Evaluator;
pub use report::{EpochSummary, TrainingReport, ValidationSummary};
pub use schedule::LinearSchedule;
pub use trainer::Trainer;
