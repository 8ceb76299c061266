//! Run configuration.
//!
//! Default values live in [`constants`](crate::constants). The binary fills a
//! [`TrainConfig`] from command-line flags; the library never reads the
//! environment.

pub mod error;


pub use error::ConfigError;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_ALPHA, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, DEFAULT_MAX_LENGTH,
    DEFAULT_SAVE_PATH, DEFAULT_SEED, DEFAULT_STUDENT_MODEL, DEFAULT_SUBSET_SIZE,
    DEFAULT_TEACHER_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TRAIN_FRACTION, DEFAULT_WARMUP_STEPS,
    RANKING_MARGIN,
};

/// Which compute device the run should be placed on.
///
/// Resolved once by [`select_device`](crate::embedding::device::select_device);
/// there is no mid-run migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Try Metal, then CUDA, then fall back to CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl FromStr for DevicePreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "metal" => Ok(Self::Metal),
            _ => Err(ConfigError::UnknownDevice {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
        };
        f.write_str(name)
    }
}

/// Hyperparameters and paths for one distillation run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Teacher model directory (frozen for the whole run).
    pub teacher_model: String,
    /// Student model directory (fine-tuned).
    pub student_model: String,
    /// Directory holding `queries.tsv`, `collection.tsv` and `qrels.tsv`.
    pub data_dir: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Tokenized sequences are truncated and padded to exactly this length.
    pub max_length: usize,
    /// Weight of the ranking loss; distillation gets `1 - alpha`.
    pub alpha: f64,
    /// Softmax temperature for distillation (`> 1` softens).
    pub temperature: f64,
    /// Hinge margin of the ranking loss.
    pub margin: f64,
    pub warmup_steps: usize,
    /// Where the fine-tuned student is written. `None` skips persistence.
    pub save_path: Option<PathBuf>,
    /// Seed for batch shuffling.
    pub seed: u64,
    /// Judgments kept from the corpus.
    pub subset_size: usize,
    /// Leading fraction of the subset used for training.
    pub train_fraction: f64,
    pub device: DevicePreference,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            teacher_model: DEFAULT_TEACHER_MODEL.to_string(),
            student_model: DEFAULT_STUDENT_MODEL.to_string(),
            data_dir: PathBuf::from("./data"),
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            max_length: DEFAULT_MAX_LENGTH,
            alpha: DEFAULT_ALPHA,
            temperature: DEFAULT_TEMPERATURE,
            margin: RANKING_MARGIN,
            warmup_steps: DEFAULT_WARMUP_STEPS,
            save_path: Some(PathBuf::from(DEFAULT_SAVE_PATH)),
            seed: DEFAULT_SEED,
            subset_size: DEFAULT_SUBSET_SIZE,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            device: DevicePreference::Auto,
        }
    }
}

impl TrainConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    pub fn without_save_path(mut self) -> Self {
        self.save_path = None;
        self
    }

    /// Checks every hyperparameter. Runs before any model is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.teacher_model.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier {
                field: "teacher_model",
            });
        }
        if self.student_model.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier {
                field: "student_model",
            });
        }
        if self.epochs == 0 {
            return Err(ConfigError::InvalidEpochs { value: self.epochs });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                value: self.batch_size,
            });
        }
        if self.max_length == 0 {
            return Err(ConfigError::InvalidMaxLength {
                value: self.max_length,
            });
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::InvalidLearningRate {
                value: self.learning_rate,
            });
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(ConfigError::InvalidTemperature {
                value: self.temperature,
            });
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::InvalidMargin { value: self.margin });
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::InvalidAlpha { value: self.alpha });
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ConfigError::InvalidTrainFraction {
                value: self.train_fraction,
            });
        }
        if self.subset_size == 0 {
            return Err(ConfigError::InvalidSubsetSize {
                value: self.subset_size,
            });
        }
        Ok(())
    }

    /// Total optimizer steps the schedule is planned over.
    pub fn total_steps(&self, batches_per_epoch: usize) -> usize {
        self.epochs * batches_per_epoch
    }
}
