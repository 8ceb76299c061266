//! End-to-end distillation runs over stub models and an on-disk corpus.

mod common;

use std::sync::Arc;

use candle_core::Device;
use ranker::config::TrainConfig;
use ranker::dataset::{PairedDataset, RelevanceCorpus};
use ranker::embedding::TextTokenizer;
use ranker::scoring::{DOCUMENT_ENCODER_FILE, QUERY_ENCODER_FILE};
use ranker::training::{Trainer, TrainingError};

use common::{TOPICS, stub_models, write_corpus};

fn run_config() -> TrainConfig {
    TrainConfig::default()
        .with_epochs(2)
        .with_batch_size(4)
        .with_learning_rate(5e-3)
        .with_max_length(16)
        .with_seed(3)
        .without_save_path()
}

fn datasets(dir: &std::path::Path, config: &TrainConfig) -> (PairedDataset, PairedDataset) {
    let tokenizer = Arc::new(TextTokenizer::stub(config.max_length));
    let examples = RelevanceCorpus::from_dir(dir)
        .unwrap()
        .into_examples()
        .unwrap()
        .truncate(config.subset_size);
    let (train, validation) = examples.split(config.train_fraction);
    (
        PairedDataset::from_examples(Arc::clone(&tokenizer), train),
        PairedDataset::from_examples(tokenizer, validation),
    )
}

#[test]
fn test_corpus_to_report() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = run_config();

    let (train, validation) = datasets(dir.path(), &config);
    assert_eq!(train.len(), 8);
    assert_eq!(validation.len(), 2);

    let (teacher, student) = stub_models();
    let report = Trainer::new(&teacher, &student, &config, &Device::Cpu)
        .unwrap()
        .with_quiet(true)
        .train(&train, &validation)
        .unwrap();

    assert_eq!(report.epochs.len(), 2);
    assert_eq!(report.global_steps, 4);
    assert_eq!(report.skipped_batches, 0);
    for (i, epoch) in report.epochs.iter().enumerate() {
        assert_eq!(epoch.epoch, i + 1);
        assert!(epoch.train_loss.unwrap().is_finite());
        assert_eq!(epoch.validation.batches, 1);
    }
    assert!(report.final_validation_loss().unwrap().is_finite());
    assert_eq!(report.epochs[1].learning_rate, 0.0);
}

#[test]
fn test_subset_and_split_follow_config() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let mut config = run_config();
    config.subset_size = 5;
    config.train_fraction = 0.6;

    let (train, validation) = datasets(dir.path(), &config);

    assert_eq!(train.len(), 3);
    assert_eq!(validation.len(), 2);
    assert!(TOPICS.len() > config.subset_size);
}

#[test]
fn test_trained_student_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = run_config().with_epochs(1);

    let (train, validation) = datasets(dir.path(), &config);
    let (teacher, student) = stub_models();
    Trainer::new(&teacher, &student, &config, &Device::Cpu)
        .unwrap()
        .with_quiet(true)
        .train(&train, &validation)
        .unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("student");
    student.save(&target).unwrap();

    assert!(target.join(QUERY_ENCODER_FILE).exists());
    assert!(target.join(DOCUMENT_ENCODER_FILE).exists());

    let saved = candle_core::safetensors::load(target.join(QUERY_ENCODER_FILE), &Device::Cpu)
        .unwrap();
    assert!(saved.contains_key("embeddings.weight"));
}

#[test]
fn test_frozen_teacher_cannot_be_saved() {
    let (teacher, _) = stub_models();
    let out = tempfile::tempdir().unwrap();

    assert!(teacher.save(out.path()).is_err());
}

#[test]
fn test_report_serializes() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = run_config().with_epochs(1);

    let (train, validation) = datasets(dir.path(), &config);
    let (teacher, student) = stub_models();
    let report = Trainer::new(&teacher, &student, &config, &Device::Cpu)
        .unwrap()
        .with_quiet(true)
        .train(&train, &validation)
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["global_steps"], 2);
    assert_eq!(json["epochs"][0]["epoch"], 1);
    assert!(json["epochs"][0]["validation"]["mean_loss"].is_number());
}

#[test]
fn test_invalid_temperature_aborts_before_training() {
    let (teacher, student) = stub_models();
    let config = run_config().with_temperature(0.0);

    let result = Trainer::new(&teacher, &student, &config, &Device::Cpu);

    assert!(matches!(result, Err(TrainingError::Config(_))));
}
