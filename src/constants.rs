//! Cross-cutting, shared constants.
//!
//! Hyperparameter defaults live here so the CLI, [`TrainConfig`](crate::TrainConfig)
//! and the tests agree on the same values.

pub const DEFAULT_TEACHER_MODEL: &str = "bert-base-uncased";
pub const DEFAULT_STUDENT_MODEL: &str = "distilbert-base-uncased";
pub const DEFAULT_SAVE_PATH: &str = "./fine_tuned_student_model";

pub const DEFAULT_EPOCHS: usize = 3;
pub const DEFAULT_BATCH_SIZE: usize = 8;
pub const DEFAULT_LEARNING_RATE: f64 = 2e-5;
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Weight of the ranking loss; the distillation loss gets `1 - alpha`.
pub const DEFAULT_ALPHA: f64 = 0.5;
pub const DEFAULT_TEMPERATURE: f64 = 2.0;

/// Fixed hinge margin of the pairwise ranking loss.
pub const RANKING_MARGIN: f64 = 1.0;

/// AdamW epsilon and decoupled weight decay for the student optimizer.
pub const ADAM_EPSILON: f64 = 1e-6;
pub const WEIGHT_DECAY: f64 = 0.0;

pub const DEFAULT_WARMUP_STEPS: usize = 0;
pub const DEFAULT_SEED: u64 = 42;

/// Number of judgments kept from the corpus before splitting.
pub const DEFAULT_SUBSET_SIZE: usize = 1000;
/// Leading fraction of the subset used for training; the rest is validation.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Hidden size of the stub encoders used when no model files are involved.
pub const STUB_HIDDEN_SIZE: usize = 32;
/// Vocabulary of the stub tokenizer; ids `0` and `1` are reserved for padding and `[CLS]`.
pub const STUB_VOCAB_SIZE: usize = 4096;
pub const STUB_PAD_ID: u32 = 0;
pub const STUB_CLS_ID: u32 = 1;
