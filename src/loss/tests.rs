use super::*;
use candle_core::{Device, Tensor, Var};

fn matrix(rows: &[&[f32]]) -> Tensor {
    let n = rows.len();
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Tensor::from_vec(flat, (n, rows[0].len()), &Device::Cpu).unwrap()
}

fn diagonal_matrix(n: usize, diag: f32, off: f32) -> Tensor {
    let mut flat = vec![off; n * n];
    for i in 0..n {
        flat[i * n + i] = diag;
    }
    Tensor::from_vec(flat, (n, n), &Device::Cpu).unwrap()
}

/// Deterministic pseudo-random matrix in roughly [-3, 3].
fn pseudo_random(n: usize, seed: u64) -> Tensor {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let flat: Vec<f32> = (0..n * n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / (1u64 << 31) as f32) * 6.0 - 3.0
        })
        .collect();
    Tensor::from_vec(flat, (n, n), &Device::Cpu).unwrap()
}

fn scalar(t: &Tensor) -> f32 {
    t.to_scalar::<f32>().unwrap()
}

#[test]
fn test_extract_positive_negative() {
    let scores = matrix(&[&[1.0, 2.0, 0.0], &[0.0, 1.0, 2.0], &[2.0, 0.0, 1.0]]);

    let pn = extract_positive_negative(&scores).unwrap();

    assert_eq!(pn.positives.to_vec1::<f32>().unwrap(), vec![1.0, 1.0, 1.0]);
    assert_eq!(pn.negatives.to_vec1::<f32>().unwrap(), vec![2.0, 2.0, 2.0]);
}

#[test]
fn test_negative_never_selects_own_positive() {
    for n in 2..7 {
        let scores = diagonal_matrix(n, 100.0, -1.0);
        let pn = extract_positive_negative(&scores).unwrap();
        for value in pn.negatives.to_vec1::<f32>().unwrap() {
            assert_eq!(value, -1.0, "batch size {n}");
        }
    }
}

#[test]
fn test_extraction_does_not_mutate_input() {
    let scores = pseudo_random(4, 7);
    let before = scores.to_vec2::<f32>().unwrap();

    let _ = extract_positive_negative(&scores).unwrap();
    let _ = distill_log_probs(&scores, 2.0).unwrap();

    assert_eq!(scores.to_vec2::<f32>().unwrap(), before);
}

#[test]
fn test_ranking_loss_zero_when_diagonal_dominates_with_zero_margin() {
    let scores = diagonal_matrix(4, 0.5, 0.1);
    let loss = scalar(&ranking_loss(&scores, 0.0).unwrap());
    assert_eq!(loss, 0.0);
}

#[test]
fn test_ranking_loss_matches_hinge() {
    let scores = matrix(&[&[3.0, 2.5], &[0.0, 1.0]]);
    // row 0: 1 - (3.0 - 2.5) = 0.5, row 1: 1 - (1.0 - 0.0) = 0.0
    let loss = scalar(&ranking_loss(&scores, 1.0).unwrap());
    assert!((loss - 0.25).abs() < 1e-6);
}

#[test]
fn test_separated_batch_has_zero_loss() {
    let teacher = diagonal_matrix(4, 5.0, 0.0);
    let student = diagonal_matrix(4, 5.0, 0.0);

    for alpha in [0.0, 0.25, 0.5, 1.0] {
        let breakdown = LossComposer::new(alpha, 2.0)
            .compose(&teacher, &student)
            .unwrap();
        assert_eq!(breakdown.ranking, 0.0);
        assert!(breakdown.distillation.abs() < 1e-6);
        assert!(breakdown.total_value.abs() < 1e-6, "alpha {alpha}");
    }
}

#[test]
fn test_violating_batch_ranking_loss() {
    let student = matrix(&[&[1.0, 2.0, 0.0], &[0.0, 1.0, 2.0], &[2.0, 0.0, 1.0]]);
    let teacher = student.clone();

    let breakdown = LossComposer::new(1.0, 2.0)
        .compose(&teacher, &student)
        .unwrap();

    assert!((breakdown.ranking - 2.0).abs() < 1e-6);
    assert!((breakdown.total_value - 2.0).abs() < 1e-6);
}

#[test]
fn test_distillation_zero_for_identical_matrices() {
    let scores = pseudo_random(5, 3);
    for temperature in [0.5, 1.0, 2.0, 4.0] {
        let loss = scalar(&distillation_loss(&scores, &scores, temperature).unwrap());
        assert!(loss.abs() < 1e-6, "temperature {temperature}: {loss}");
    }
}

#[test]
fn test_distillation_non_negative() {
    for seed in 0..10 {
        let teacher = pseudo_random(4, seed);
        let student = pseudo_random(4, seed + 100);
        let loss = scalar(&distillation_loss(&teacher, &student, 2.0).unwrap());
        assert!(loss >= -1e-6, "seed {seed}: {loss}");
    }
}

#[test]
fn test_distillation_uniform_matrices_ignore_temperature() {
    let teacher = Tensor::full(3.0f32, (3, 3), &Device::Cpu).unwrap();
    let student = Tensor::full(-1.0f32, (3, 3), &Device::Cpu).unwrap();

    for temperature in [0.5, 2.0, 8.0] {
        let loss = scalar(&distillation_loss(&teacher, &student, temperature).unwrap());
        assert!(loss.abs() < 1e-6);
    }
}

#[test]
fn test_distillation_uses_unmasked_diagonal() {
    // Same off-diagonal entries, different diagonals: only an unmasked
    // comparison sees a difference.
    let teacher = diagonal_matrix(3, 4.0, 0.0);
    let student = diagonal_matrix(3, 0.0, 0.0);

    let loss = scalar(&distillation_loss(&teacher, &student, 1.0).unwrap());

    assert!(loss > 0.1);
}

#[test]
fn test_alpha_one_is_pure_ranking() {
    let teacher = pseudo_random(4, 1);
    let student = pseudo_random(4, 2);

    let breakdown = LossComposer::new(1.0, 2.0)
        .compose(&teacher, &student)
        .unwrap();

    assert_eq!(breakdown.total_value, breakdown.ranking);
}

#[test]
fn test_alpha_zero_is_pure_distillation() {
    let teacher = pseudo_random(4, 1);
    let student = pseudo_random(4, 2);

    let breakdown = LossComposer::new(0.0, 2.0)
        .compose(&teacher, &student)
        .unwrap();

    assert_eq!(breakdown.total_value, breakdown.distillation);
}

#[test]
fn test_blend_is_convex_combination() {
    let teacher = pseudo_random(4, 5);
    let student = pseudo_random(4, 6);

    let breakdown = LossComposer::new(0.3, 2.0)
        .compose(&teacher, &student)
        .unwrap();

    let expected = 0.3 * breakdown.ranking + 0.7 * breakdown.distillation;
    assert!((breakdown.total_value - expected).abs() < 1e-5);
}

#[test]
fn test_single_pair_batch_is_degenerate() {
    let scores = matrix(&[&[1.0]]);

    let result = LossComposer::default().compose(&scores, &scores);

    assert!(matches!(
        result,
        Err(LossError::DegenerateBatch { batch_size: 1 })
    ));
    assert!(result.unwrap_err().is_recoverable());
}

#[test]
fn test_non_square_scores_rejected() {
    let scores = Tensor::zeros((2, 3), candle_core::DType::F32, &Device::Cpu).unwrap();
    assert!(matches!(
        ranking_loss(&scores, 1.0),
        Err(LossError::NotSquare { rows: 2, cols: 3 })
    ));
}

#[test]
fn test_teacher_student_shape_mismatch() {
    let teacher = diagonal_matrix(3, 1.0, 0.0);
    let student = diagonal_matrix(2, 1.0, 0.0);

    let result = LossComposer::default().compose(&teacher, &student);

    assert!(matches!(result, Err(LossError::ShapeMismatch { .. })));
}

#[test]
fn test_non_finite_scores_are_reported() {
    let teacher = diagonal_matrix(2, 1.0, 0.0);
    let student = matrix(&[&[f32::NAN, 0.0], &[0.0, 1.0]]);

    let result = LossComposer::default().compose(&teacher, &student);

    let err = result.unwrap_err();
    assert!(matches!(err, LossError::NonFiniteLoss { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_gradient_reaches_student_only() {
    let teacher = Var::from_tensor(&pseudo_random(3, 11)).unwrap();
    let student = Var::from_tensor(&pseudo_random(3, 12)).unwrap();

    let breakdown = LossComposer::new(0.5, 2.0)
        .compose(teacher.as_tensor(), student.as_tensor())
        .unwrap();
    let grads = breakdown.total.backward().unwrap();

    assert!(grads.get(student.as_tensor()).is_some());
    assert!(grads.get(teacher.as_tensor()).is_none());
}

#[test]
fn test_ranking_only_matches_ranking_component() {
    let teacher = pseudo_random(4, 21);
    let student = pseudo_random(4, 22);
    let composer = LossComposer::default();

    let breakdown = composer.compose(&teacher, &student).unwrap();
    let ranking = composer.ranking_only(&student).unwrap();

    assert_eq!(ranking, breakdown.ranking);
}

#[test]
#[should_panic(expected = "alpha must be between 0.0 and 1.0")]
fn test_alpha_out_of_range_panics() {
    let _ = LossComposer::new(1.5, 2.0);
}
