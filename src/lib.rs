//! Ranker distillation library crate (used by the binary and integration tests).
//!
//! Trains a compact dual-encoder relevance ranker (the student) to reproduce
//! the in-batch score distribution of a larger frozen ranker (the teacher),
//! while also optimizing a margin ranking objective over labeled pairs.
//!
//! ## Modules
//! - [`embedding`] - Device selection, tokenizer and text encoder collaborators
//! - [`scoring`] - [`DualEncoderScorer`]: `B×B` inner-product score matrices
//! - [`loss`] - [`LossComposer`]: hardest in-batch negative hinge + KL distillation
//! - [`dataset`] - Relevance corpus loading, [`PairedDataset`], [`BatchLoader`]
//! - [`training`] - [`Trainer`], [`Evaluator`], [`LinearSchedule`]
//! - [`config`] - [`TrainConfig`] and validation
//!
//! ## Test/Mock Support
//! Stub collaborators need no model files. [`TextTokenizer::stub`],
//! [`TextEncoder::stub`] and [`DualEncoderScorer::stub`] are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod dataset;
pub mod embedding;
pub mod loss;
pub mod scoring;
pub mod training;

pub use config::{ConfigError, DevicePreference, TrainConfig};
pub use dataset::{
    BatchLoader, DatasetError, Example, Examples, PairBatch, PairedDataset, RelevanceCorpus,
    TokenizedPair,
};
pub use embedding::{
    EncoderError, EncoderFamily, ExtractionPolicy, TextEncoder, TextTokenizer, TokenizedBatch,
    TokenizedInput, WeightMode, select_device,
};
pub use loss::{LossBreakdown, LossComposer, LossError};
pub use scoring::{DualEncoderScorer, ScoringError};
pub use training::{
    EpochSummary, Evaluator, LinearSchedule, Trainer, TrainingError, TrainingReport,
    ValidationSummary,
};
