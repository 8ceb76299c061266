//! Distillation training entrypoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ranker::config::{DevicePreference, TrainConfig};
use ranker::constants::{
    DEFAULT_ALPHA, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, DEFAULT_MAX_LENGTH,
    DEFAULT_SAVE_PATH, DEFAULT_SEED, DEFAULT_STUDENT_MODEL, DEFAULT_SUBSET_SIZE,
    DEFAULT_TEACHER_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TRAIN_FRACTION, DEFAULT_WARMUP_STEPS,
    RANKING_MARGIN,
};
use ranker::dataset::{PairedDataset, RelevanceCorpus};
use ranker::embedding::{TextTokenizer, WeightMode, select_device};
use ranker::scoring::DualEncoderScorer;
use ranker::training::{Trainer, TrainingReport};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const REPORT_FILE: &str = "training_report.json";

/// Distil a dual-encoder relevance ranker into a smaller student.
#[derive(Debug, Parser)]
#[command(name = "ranker-distill", version, about, long_about = None)]
struct Cli {
    /// Teacher model directory (config.json, model.safetensors, tokenizer.json).
    #[arg(long, alias = "teacher_model", default_value = DEFAULT_TEACHER_MODEL)]
    teacher_model: String,

    /// Student model directory.
    #[arg(long, alias = "student_model", default_value = DEFAULT_STUDENT_MODEL)]
    student_model: String,

    /// Directory with queries.tsv, collection.tsv and qrels.tsv.
    #[arg(long, alias = "data_dir", default_value = "./data")]
    data_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_EPOCHS)]
    epochs: usize,

    #[arg(long, alias = "batch_size", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    #[arg(long, alias = "learning_rate", default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f64,

    /// Token length every text is truncated and padded to.
    #[arg(long, alias = "max_length", default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Weight of the ranking loss (0.0 to 1.0); distillation gets the rest.
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    alpha: f64,

    /// Distillation softmax temperature (> 0).
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Hinge margin of the ranking loss (>= 0).
    #[arg(long, default_value_t = RANKING_MARGIN)]
    margin: f64,

    #[arg(long, alias = "warmup_steps", default_value_t = DEFAULT_WARMUP_STEPS)]
    warmup_steps: usize,

    /// Where the fine-tuned student is written.
    #[arg(long, alias = "save_path", default_value = DEFAULT_SAVE_PATH)]
    save_path: PathBuf,

    /// Skip saving the student after training.
    #[arg(long)]
    no_save: bool,

    /// Seed for batch shuffling.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Judgments kept from the corpus before the train/validation split.
    #[arg(long, alias = "subset_size", default_value_t = DEFAULT_SUBSET_SIZE)]
    subset_size: usize,

    /// Leading fraction of the subset used for training.
    #[arg(long, alias = "train_fraction", default_value_t = DEFAULT_TRAIN_FRACTION)]
    train_fraction: f64,

    /// auto, cpu, cuda or metal.
    #[arg(long, default_value = "auto")]
    device: DevicePreference,

    /// Hide the progress bar.
    #[arg(long, short = 'q')]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> TrainConfig {
        TrainConfig {
            teacher_model: self.teacher_model.clone(),
            student_model: self.student_model.clone(),
            data_dir: self.data_dir.clone(),
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            max_length: self.max_length,
            alpha: self.alpha,
            temperature: self.temperature,
            margin: self.margin,
            warmup_steps: self.warmup_steps,
            save_path: (!self.no_save).then(|| self.save_path.clone()),
            seed: self.seed,
            subset_size: self.subset_size,
            train_fraction: self.train_fraction,
            device: self.device,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli.to_config();
    config.validate()?;

    info!(
        teacher = %config.teacher_model,
        student = %config.student_model,
        data_dir = %config.data_dir.display(),
        device = %config.device,
        "Ranker distillation starting"
    );

    let device = select_device(config.device)?;

    // Both models read text through the teacher's tokenizer.
    let tokenizer = Arc::new(
        TextTokenizer::from_model_dir(Path::new(&config.teacher_model), config.max_length)
            .context("Failed to load teacher tokenizer")?,
    );

    let examples = RelevanceCorpus::from_dir(&config.data_dir)
        .with_context(|| format!("Failed to load corpus from {}", config.data_dir.display()))?
        .into_examples()?
        .truncate(config.subset_size);
    let (train_examples, validation_examples) = examples.split(config.train_fraction);

    info!(
        train = train_examples.len(),
        validation = validation_examples.len(),
        "Dataset ready"
    );
    if validation_examples.is_empty() {
        warn!("Validation split is empty; validation loss will not be reported");
    }

    let train = PairedDataset::from_examples(Arc::clone(&tokenizer), train_examples);
    let validation = PairedDataset::from_examples(tokenizer, validation_examples);

    let teacher = DualEncoderScorer::load(&config.teacher_model, WeightMode::Frozen, &device)
        .with_context(|| format!("Failed to load teacher model '{}'", config.teacher_model))?;
    let student = DualEncoderScorer::load(&config.student_model, WeightMode::Trainable, &device)
        .with_context(|| format!("Failed to load student model '{}'", config.student_model))?;

    let report = Trainer::new(&teacher, &student, &config, &device)?
        .with_quiet(cli.quiet)
        .train(&train, &validation)?;

    if let Some(path) = &config.save_path {
        student
            .save(path)
            .with_context(|| format!("Failed to save student to {}", path.display()))?;
        write_report(&report, &path.join(REPORT_FILE))?;
    }

    info!(
        epochs = report.epochs.len(),
        steps = report.global_steps,
        skipped = report.skipped_batches,
        train_loss = report.final_train_loss().unwrap_or(f32::NAN),
        validation_loss = report.final_validation_loss().unwrap_or(f32::NAN),
        "Ranker distillation complete"
    );
    Ok(())
}

fn write_report(report: &TrainingReport, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "Training report written");
    Ok(())
}
