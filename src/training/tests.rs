use std::sync::Arc;

use super::*;
use crate::config::TrainConfig;
use crate::dataset::{BatchLoader, Example, Examples, PairedDataset};
use crate::embedding::{TextTokenizer, WeightMode};
use crate::loss::LossComposer;
use crate::scoring::DualEncoderScorer;
use candle_core::{Device, Tensor, Var};

use super::trainer::{gradients_finite, optimizer_params};

const EPS: f64 = 1e-12;

fn dataset(n: usize, offset: usize) -> PairedDataset {
    let examples: Examples = (offset..offset + n)
        .map(|i| {
            Example::new(
                format!("query about topic {i}"),
                format!("passage describing topic {i} in detail"),
                1.0,
            )
        })
        .collect();
    PairedDataset::from_examples(Arc::new(TextTokenizer::stub(12)), examples)
}

fn config(epochs: usize, batch_size: usize) -> TrainConfig {
    TrainConfig::default()
        .with_epochs(epochs)
        .with_batch_size(batch_size)
        .with_learning_rate(1e-2)
        .with_max_length(12)
        .without_save_path()
}

fn models() -> (DualEncoderScorer, DualEncoderScorer) {
    let teacher = DualEncoderScorer::stub(100, WeightMode::Frozen, &Device::Cpu).unwrap();
    let student = DualEncoderScorer::stub(200, WeightMode::Trainable, &Device::Cpu).unwrap();
    (teacher, student)
}

fn snapshot(tensors: &[Tensor]) -> Vec<Vec<f32>> {
    tensors
        .iter()
        .map(|t| t.flatten_all().unwrap().to_vec1::<f32>().unwrap())
        .collect()
}

#[test]
fn test_schedule_decays_linearly_to_zero() {
    let config = TrainConfig::default().with_epochs(3);
    let schedule = LinearSchedule::new(2e-5, 0, config.total_steps(2));

    assert_eq!(schedule.total_steps(), 6);
    assert!((schedule.lr_at(0) - 2e-5).abs() < EPS);
    for step in 0..6 {
        let expected = 2e-5 * (6 - step) as f64 / 6.0;
        assert!((schedule.lr_at(step) - expected).abs() < EPS, "step {step}");
    }
    assert_eq!(schedule.lr_at(6), 0.0);
}

#[test]
fn test_schedule_clamps_after_total_steps() {
    let schedule = LinearSchedule::new(1.0, 0, 4);
    assert_eq!(schedule.lr_at(10), 0.0);
}

#[test]
fn test_schedule_warmup() {
    let schedule = LinearSchedule::new(1.0, 2, 6);

    assert_eq!(schedule.lr_at(0), 0.0);
    assert!((schedule.lr_at(1) - 0.5).abs() < EPS);
    assert!((schedule.lr_at(2) - 1.0).abs() < EPS);
    assert!((schedule.lr_at(4) - 0.5).abs() < EPS);
    assert_eq!(schedule.lr_at(6), 0.0);
}

#[test]
fn test_schedule_without_steps() {
    let schedule = LinearSchedule::new(1.0, 0, 0);
    assert_eq!(schedule.lr_at(0), 0.0);
}

#[test]
fn test_one_epoch_reports_once_and_evaluates_once() {
    let (teacher, student) = models();
    let train = dataset(8, 0);
    let validation = dataset(4, 100);

    let trainer = Trainer::new(&teacher, &student, &config(1, 4), &Device::Cpu)
        .unwrap()
        .with_quiet(true);
    let report = trainer.train(&train, &validation).unwrap();

    assert_eq!(report.epochs.len(), 1);
    let epoch = &report.epochs[0];
    assert_eq!(epoch.epoch, 1);
    assert_eq!(epoch.applied_steps, 2);
    assert_eq!(epoch.skipped_batches, 0);
    assert!(epoch.train_loss.unwrap().is_finite());
    assert_eq!(epoch.validation.batches, 1);
    assert!(epoch.validation.mean_loss.is_some());
    assert_eq!(report.global_steps, 2);
    assert_eq!(epoch.learning_rate, 0.0);
}

#[test]
fn test_single_pair_batch_is_skipped() {
    let (teacher, student) = models();
    let train = dataset(9, 0);
    let validation = dataset(4, 100);

    let trainer = Trainer::new(&teacher, &student, &config(2, 4), &Device::Cpu)
        .unwrap()
        .with_quiet(true);
    let report = trainer.train(&train, &validation).unwrap();

    assert_eq!(report.epochs.len(), 2);
    for epoch in &report.epochs {
        assert_eq!(epoch.applied_steps, 2);
        assert_eq!(epoch.skipped_batches, 1);
    }
    assert_eq!(report.global_steps, 4);
    assert_eq!(report.skipped_batches, 2);
}

#[test]
fn test_non_finite_loss_leaves_student_untouched() {
    let (teacher, student) = models();
    for var in student.trainable_vars() {
        let huge = Tensor::full(1e30f32, var.dims(), &Device::Cpu).unwrap();
        var.set(&huge).unwrap();
    }
    let copies: Vec<Tensor> = student
        .trainable_vars()
        .iter()
        .map(|v| v.as_tensor().copy().unwrap())
        .collect();

    let report = Trainer::new(&teacher, &student, &config(1, 4), &Device::Cpu)
        .unwrap()
        .with_quiet(true)
        .train(&dataset(8, 0), &dataset(4, 100))
        .unwrap();

    let after: Vec<Tensor> = student
        .trainable_vars()
        .iter()
        .map(|v| v.as_tensor().clone())
        .collect();
    assert_eq!(snapshot(&copies), snapshot(&after));

    let epoch = &report.epochs[0];
    assert_eq!(epoch.applied_steps, 0);
    assert_eq!(epoch.skipped_batches, 2);
    assert_eq!(epoch.train_loss, None);
    assert!((epoch.learning_rate - 1e-2).abs() < EPS);
    assert_eq!(report.global_steps, 0);
    assert_eq!(report.skipped_batches, 2);
}

#[test]
fn test_gradients_finite_flags_nan_and_inf() {
    let finite = Var::new(&[1.0f32, 2.0], &Device::Cpu).unwrap();
    let infinite = Var::new(&[0.0f32, 1.0], &Device::Cpu).unwrap();
    let nan = Var::new(&[-1.0f32], &Device::Cpu).unwrap();
    let unused = Var::new(&[3.0f32], &Device::Cpu).unwrap();

    let loss = (finite.as_tensor().sqr().unwrap().sum_all().unwrap()
        + infinite.as_tensor().log().unwrap().sum_all().unwrap())
    .unwrap();
    let loss = (loss + nan.as_tensor().sqrt().unwrap().sum_all().unwrap()).unwrap();
    let grads = loss.backward().unwrap();

    assert!(gradients_finite(&grads, &[finite.clone(), unused]).unwrap());
    assert!(!gradients_finite(&grads, &[finite.clone(), infinite]).unwrap());
    assert!(!gradients_finite(&grads, &[finite, nan]).unwrap());
}

#[test]
fn test_optimizer_params() {
    let params = optimizer_params(3e-5);

    assert_eq!(params.lr, 3e-5);
    assert_eq!(params.weight_decay, 0.0);
    assert_eq!(params.eps, 1e-6);
}

#[test]
fn test_student_updates_and_teacher_stays_frozen() {
    let (teacher, student) = models();
    let train = dataset(8, 0);
    let validation = dataset(4, 100);

    let sample = dataset(4, 500);
    let mut sample_loader = BatchLoader::sequential(&sample, 4, &Device::Cpu);
    let sample_batch = sample_loader.epoch().next().unwrap().unwrap();

    let teacher_before: Vec<Vec<f32>> = teacher
        .score(&sample_batch.queries, &sample_batch.documents)
        .unwrap()
        .to_vec2()
        .unwrap();
    let student_vars: Vec<Tensor> = student
        .trainable_vars()
        .iter()
        .map(|v| v.as_tensor().copy().unwrap())
        .collect();

    Trainer::new(&teacher, &student, &config(1, 4), &Device::Cpu)
        .unwrap()
        .with_quiet(true)
        .train(&train, &validation)
        .unwrap();

    let teacher_after: Vec<Vec<f32>> = teacher
        .score(&sample_batch.queries, &sample_batch.documents)
        .unwrap()
        .to_vec2()
        .unwrap();
    let student_after: Vec<Tensor> = student
        .trainable_vars()
        .iter()
        .map(|v| v.as_tensor().clone())
        .collect();

    assert_eq!(teacher_before, teacher_after);
    assert_ne!(snapshot(&student_vars), snapshot(&student_after));
}

#[test]
fn test_frozen_student_is_rejected() {
    let teacher = DualEncoderScorer::stub(1, WeightMode::Frozen, &Device::Cpu).unwrap();
    let student = DualEncoderScorer::stub(2, WeightMode::Frozen, &Device::Cpu).unwrap();

    let result = Trainer::new(&teacher, &student, &config(1, 4), &Device::Cpu);

    assert!(matches!(
        result,
        Err(TrainingError::StudentNotTrainable { .. })
    ));
}

#[test]
fn test_invalid_config_is_rejected_before_training() {
    let (teacher, student) = models();
    let bad = config(1, 4).with_alpha(1.5);

    let result = Trainer::new(&teacher, &student, &bad, &Device::Cpu);

    assert!(matches!(result, Err(TrainingError::Config(_))));
}

#[test]
fn test_empty_training_set_is_rejected() {
    let (teacher, student) = models();
    let trainer = Trainer::new(&teacher, &student, &config(1, 4), &Device::Cpu)
        .unwrap()
        .with_quiet(true);

    let result = trainer.train(&dataset(0, 0), &dataset(4, 0));

    assert!(matches!(result, Err(TrainingError::EmptyTrainingSet)));
}

#[test]
fn test_evaluator_reports_mean_ranking_loss() {
    let (_, student) = models();
    let validation = dataset(8, 0);
    let composer = LossComposer::default();

    let mut loader = BatchLoader::sequential(&validation, 4, &Device::Cpu);
    let summary = Evaluator::new(composer)
        .evaluate(&student, &mut loader)
        .unwrap();

    let mut expected = 0.0f32;
    for batch in loader.epoch() {
        let batch = batch.unwrap();
        let scores = student.score(&batch.queries, &batch.documents).unwrap();
        expected += composer.ranking_only(&scores).unwrap();
    }
    expected /= 2.0;

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.skipped_batches, 0);
    assert!((summary.mean_loss.unwrap() - expected).abs() < 1e-5);
}

#[test]
fn test_evaluator_skips_single_pair_batches() {
    let (_, student) = models();
    let validation = dataset(1, 0);

    let mut loader = BatchLoader::sequential(&validation, 4, &Device::Cpu);
    let summary = Evaluator::new(LossComposer::default())
        .evaluate(&student, &mut loader)
        .unwrap();

    assert_eq!(summary.batches, 0);
    assert_eq!(summary.skipped_batches, 1);
    assert_eq!(summary.mean_loss, None);
}

#[test]
fn test_report_accessors() {
    let report = TrainingReport {
        epochs: vec![EpochSummary {
            epoch: 1,
            train_loss: Some(0.5),
            applied_steps: 2,
            skipped_batches: 0,
            learning_rate: 0.0,
            validation: ValidationSummary {
                mean_loss: Some(0.7),
                batches: 1,
                skipped_batches: 0,
            },
        }],
        global_steps: 2,
        skipped_batches: 0,
    };

    assert_eq!(report.final_train_loss(), Some(0.5));
    assert_eq!(report.final_validation_loss(), Some(0.7));
    assert_eq!(TrainingReport::default().final_validation_loss(), None);
}
