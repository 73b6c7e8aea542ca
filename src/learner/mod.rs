//! Stochastic linear learners.
//!
//! Each learner family exposes two entry points: a pointwise step on a
//! single example and a pairwise rank step on the difference of two
//! examples. Both return a "nonzero loss" signal used for diagnostics.
//!
//! | Family              | Update when loss is nonzero          | Regularization | Projection        |
//! |---------------------|--------------------------------------|----------------|-------------------|
//! | `Pegasos`           | hinge: `w += η·y·x` if `y·w·x < 1`   | L2 pre-step    | Pegasos           |
//! | `SgdSvm`            | same as Pegasos                      | L2 pre-step    | none              |
//! | `MarginPerceptron`  | `w += η·y·x` if `y·w·x ≤ c`          | none           | none              |
//! | `PassiveAggressive` | clipped `(1−y·w·x)/‖x‖²` step        | none           | Pegasos if λ > 0  |
//! | `LogregPegasos`     | `w += η·y/(1+e^{y·w·x})·x` always    | L2 pre-step    | Pegasos           |
//! | `Logreg`            | as above, no projection              | L2 pre-step    | none              |
//! | `LmsRegression`     | `w += η·(y − w·x)·x` always          | L2 pre-step    | Pegasos           |
//! | `Romma`             | closed-form `c,d` update, `c ≥ 0`    | none           | none              |
//!
//! Families and schedules are plain enums dispatched with a single `match`
//! per step; the inner training loop pays no dynamic-dispatch cost.

pub mod loops;

use crate::types::SparseVector;
use crate::weights::{WeightVector, MIN_SCALING_FACTOR};

/// Denominator floor for the ROMMA closed-form update.
const ROMMA_DENOMINATOR_FLOOR: f32 = 1e-10;

/// The supported learner families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearnerType {
    /// Stochastic sub-gradient SVM with the Pegasos projection.
    Pegasos,
    /// Pegasos update without the projection step.
    SgdSvm,
    /// Perceptron with a fixed margin `c`.
    MarginPerceptron,
    /// Passive-aggressive update, step clipped at `c`.
    PassiveAggressive,
    /// Logistic regression with L2 and Pegasos projection.
    LogregPegasos,
    /// Logistic regression with L2, no projection.
    Logreg,
    /// Least-mean-squares regression.
    LmsRegression,
    /// Relaxed online maximum-margin algorithm.
    Romma,
}

/// Learning-rate schedules. The step index is 1-based across a training
/// pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtaType {
    /// `η_i = 10 / (i + 10)`
    Basic,
    /// `η_i = 1 / (λ·i)`
    Pegasos,
    /// `η = 0.02`
    Constant,
}

/// Learning rate for step `i` under the given schedule.
pub fn eta_value(eta_type: EtaType, lambda: f32, i: usize) -> f32 {
    match eta_type {
        EtaType::Basic => 10.0 / (i as f32 + 10.0),
        EtaType::Pegasos => 1.0 / (lambda * i as f32),
        EtaType::Constant => 0.02,
    }
}

/// One pointwise stochastic step for the given family. Returns whether the
/// example had nonzero loss.
pub fn learner_step(
    learner: LearnerType,
    x: &SparseVector,
    eta: f32,
    c: f32,
    lambda: f32,
    w: &mut WeightVector,
) -> bool {
    match learner {
        LearnerType::Pegasos => pegasos_step(x, eta, lambda, w),
        LearnerType::SgdSvm => sgd_svm_step(x, eta, lambda, w),
        LearnerType::MarginPerceptron => margin_perceptron_step(x, eta, c, w),
        LearnerType::PassiveAggressive => passive_aggressive_step(x, lambda, c, w),
        LearnerType::LogregPegasos => logreg_pegasos_step(x, eta, lambda, w),
        LearnerType::Logreg => logreg_step(x, eta, lambda, w),
        LearnerType::LmsRegression => least_mean_squares_step(x, eta, lambda, w),
        LearnerType::Romma => romma_step(x, w),
    }
}

/// One pairwise rank step on `(a - b)`. The effective label is
/// `sign(y_a - y_b)`, zero meaning a tie (no update for the gated
/// families). The logistic-Pegasos family accepts override labels; `None`
/// falls back to the vectors' own labels.
#[allow(clippy::too_many_arguments)]
pub fn learner_rank_step(
    learner: LearnerType,
    a: &SparseVector,
    b: &SparseVector,
    eta: f32,
    c: f32,
    lambda: f32,
    w: &mut WeightVector,
    y_a: Option<f32>,
    y_b: Option<f32>,
) -> bool {
    match learner {
        LearnerType::Pegasos => pegasos_rank_step(a, b, eta, lambda, w),
        LearnerType::SgdSvm => sgd_svm_rank_step(a, b, eta, lambda, w),
        LearnerType::MarginPerceptron => margin_perceptron_rank_step(a, b, eta, c, w),
        LearnerType::PassiveAggressive => passive_aggressive_rank_step(a, b, lambda, c, w),
        LearnerType::LogregPegasos => logreg_pegasos_rank_step(a, b, eta, lambda, w, y_a, y_b),
        LearnerType::Logreg => logreg_rank_step(a, b, eta, lambda, w),
        LearnerType::LmsRegression => least_mean_squares_rank_step(a, b, eta, lambda, w),
        LearnerType::Romma => romma_rank_step(a, b, w),
    }
}

/// Scale `w` by `1 - η·λ`, floored at `MIN_SCALING_FACTOR`.
pub fn l2_regularize(eta: f32, lambda: f32, w: &mut WeightVector) {
    let scaling_factor = 1.0 - eta * lambda;
    if scaling_factor > MIN_SCALING_FACTOR {
        w.scale_by(scaling_factor);
    } else {
        w.scale_by(MIN_SCALING_FACTOR);
    }
}

/// Multi-step variant: the floor comparison composes `(1 - η·λ)^k`, but the
/// scale actually applied is the single-step factor.
pub fn l2_regularize_several_steps(eta: f32, lambda: f32, effective_steps: f32, w: &mut WeightVector) {
    let scaling_factor = (1.0 - eta * lambda).powf(effective_steps);
    if scaling_factor > MIN_SCALING_FACTOR {
        w.scale_by(1.0 - eta * lambda);
    } else {
        w.scale_by(MIN_SCALING_FACTOR);
    }
}

/// Project `w` onto the ball of radius `1/√λ`.
pub fn pegasos_projection(lambda: f32, w: &mut WeightVector) {
    let projection_val = 1.0 / (lambda * w.squared_norm()).sqrt();
    if projection_val < 1.0 {
        w.scale_by(projection_val);
    }
}

fn pegasos_step(x: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let p = x.y() * w.inner_product(x);

    l2_regularize(eta, lambda, w);
    if p < 1.0 && x.y() != 0.0 {
        w.add_vector(x, eta * x.y());
    }

    pegasos_projection(lambda, w);
    p < 1.0 && x.y() != 0.0
}

fn sgd_svm_step(x: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let p = x.y() * w.inner_product(x);

    l2_regularize(eta, lambda, w);
    if p < 1.0 && x.y() != 0.0 {
        w.add_vector(x, eta * x.y());
    }

    p < 1.0 && x.y() != 0.0
}

fn margin_perceptron_step(x: &SparseVector, eta: f32, c: f32, w: &mut WeightVector) -> bool {
    if x.y() * w.inner_product(x) <= c {
        w.add_vector(x, eta * x.y());
        true
    } else {
        false
    }
}

fn passive_aggressive_step(x: &SparseVector, lambda: f32, max_step: f32, w: &mut WeightVector) -> bool {
    let p = 1.0 - x.y() * w.inner_product(x);
    if p > 0.0 && x.y() != 0.0 {
        let mut step = p / x.squared_norm();
        if step > max_step {
            step = max_step;
        }
        w.add_vector(x, step * x.y());
    }

    if lambda > 0.0 {
        pegasos_projection(lambda, w);
    }
    p < 1.0 && x.y() != 0.0
}

fn logreg_pegasos_step(x: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let loss = x.y() / (1.0 + (x.y() * w.inner_product(x)).exp());

    l2_regularize(eta, lambda, w);
    w.add_vector(x, eta * loss);
    pegasos_projection(lambda, w);
    true
}

fn logreg_step(x: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let loss = x.y() / (1.0 + (x.y() * w.inner_product(x)).exp());

    l2_regularize(eta, lambda, w);
    w.add_vector(x, eta * loss);
    true
}

fn least_mean_squares_step(x: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let loss = x.y() - w.inner_product(x);
    l2_regularize(eta, lambda, w);
    w.add_vector(x, eta * loss);
    pegasos_projection(lambda, w);
    true
}

fn romma_step(x: &SparseVector, w: &mut WeightVector) -> bool {
    let wx = w.inner_product(x);
    let p = x.y() * wx;

    if p < 1.0 && x.y() != 0.0 {
        let xx = x.squared_norm();
        let ww = w.squared_norm();
        let c = ((xx * ww) - p + ROMMA_DENOMINATOR_FLOOR)
            / ((xx * ww) - (wx * wx) + ROMMA_DENOMINATOR_FLOOR);
        let d = (ww * (x.y() - wx) + ROMMA_DENOMINATOR_FLOOR)
            / ((xx * ww) - (wx * wx) + ROMMA_DENOMINATOR_FLOOR);

        // Examples of extremely low magnitude can push c negative; skip them.
        if c >= 0.0 {
            w.scale_by(c);
            w.add_vector(x, d);
        }
    }

    p < 1.0 && x.y() != 0.0
}

/// `sign(y_a - y_b)` as the effective pairwise label.
fn rank_label(y_a: f32, y_b: f32) -> f32 {
    if y_a > y_b {
        1.0
    } else if y_a < y_b {
        -1.0
    } else {
        0.0
    }
}

fn pegasos_rank_step(a: &SparseVector, b: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let y = rank_label(a.y(), b.y());
    let p = y * w.inner_product_on_difference(a, b);

    l2_regularize(eta, lambda, w);
    if p < 1.0 && y != 0.0 {
        w.add_vector(a, eta * y);
        w.add_vector(b, -eta * y);
    }

    pegasos_projection(lambda, w);
    p < 1.0 && y != 0.0
}

fn sgd_svm_rank_step(a: &SparseVector, b: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let y = rank_label(a.y(), b.y());
    let p = y * w.inner_product_on_difference(a, b);

    l2_regularize(eta, lambda, w);
    if p < 1.0 && y != 0.0 {
        w.add_vector(a, eta * y);
        w.add_vector(b, -eta * y);
    }

    p < 1.0 && y != 0.0
}

// The margin-perceptron pair update applies the raw step size, without the
// pairwise label factor.
fn margin_perceptron_rank_step(a: &SparseVector, b: &SparseVector, eta: f32, c: f32, w: &mut WeightVector) -> bool {
    let y = rank_label(a.y(), b.y());
    if y * w.inner_product_on_difference(a, b) <= c {
        w.add_vector(a, eta);
        w.add_vector(b, -eta);
        true
    } else {
        false
    }
}

fn passive_aggressive_rank_step(
    a: &SparseVector,
    b: &SparseVector,
    lambda: f32,
    max_step: f32,
    w: &mut WeightVector,
) -> bool {
    let y = rank_label(a.y(), b.y());
    let p = 1.0 - y * w.inner_product_on_difference(a, b);
    if p > 0.0 && y != 0.0 {
        let squared_norm = SparseVector::difference_squared_norm(a, b);
        let mut step = p / squared_norm;
        if step > max_step {
            step = max_step;
        }
        w.add_vector(a, step * y);
        w.add_vector(b, -step * y);
    }

    if lambda > 0.0 {
        pegasos_projection(lambda, w);
    }
    p > 0.0 && y != 0.0
}

fn logreg_pegasos_rank_step(
    a: &SparseVector,
    b: &SparseVector,
    eta: f32,
    lambda: f32,
    w: &mut WeightVector,
    y_a: Option<f32>,
    y_b: Option<f32>,
) -> bool {
    let y_a = y_a.unwrap_or_else(|| a.y());
    let y_b = y_b.unwrap_or_else(|| b.y());
    let y = rank_label(y_a, y_b);
    let loss = y / (1.0 + (y * w.inner_product_on_difference(a, b)).exp());

    l2_regularize(eta, lambda, w);
    w.add_vector(a, eta * loss);
    w.add_vector(b, -eta * loss);

    pegasos_projection(lambda, w);
    true
}

fn logreg_rank_step(a: &SparseVector, b: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let y = rank_label(a.y(), b.y());
    let loss = y / (1.0 + (y * w.inner_product_on_difference(a, b)).exp());

    l2_regularize(eta, lambda, w);
    w.add_vector(a, eta * loss);
    w.add_vector(b, -eta * loss);
    true
}

// LMS regresses on the raw label difference rather than its sign.
fn least_mean_squares_rank_step(a: &SparseVector, b: &SparseVector, eta: f32, lambda: f32, w: &mut WeightVector) -> bool {
    let y = a.y() - b.y();
    let loss = y - w.inner_product_on_difference(a, b);

    l2_regularize(eta, lambda, w);
    w.add_vector(a, eta * loss);
    w.add_vector(b, -eta * loss);
    pegasos_projection(lambda, w);
    true
}

// Materializes (a - b) and reuses the pointwise step; not the cheapest
// route, but it inherits the squared-norm handling for free.
fn romma_rank_step(a: &SparseVector, b: &SparseVector, w: &mut WeightVector) -> bool {
    let y = rank_label(a.y(), b.y());
    if y != 0.0 {
        let x_diff = SparseVector::difference(a, b, y);
        romma_step(&x_diff, w)
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(pairs: &[(u32, f32)]) -> SparseVector {
        SparseVector::new(pairs, 1.0)
    }

    fn neg(pairs: &[(u32, f32)]) -> SparseVector {
        SparseVector::new(pairs, -1.0)
    }

    #[test]
    fn test_eta_schedules() {
        assert!((eta_value(EtaType::Basic, 0.0, 1) - 10.0 / 11.0).abs() < 1e-6);
        assert!((eta_value(EtaType::Pegasos, 0.1, 5) - 2.0).abs() < 1e-6);
        assert!((eta_value(EtaType::Constant, 0.5, 99) - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_pegasos_step_on_misclassified_example() {
        let mut w = WeightVector::new(2);
        let x = pos(&[(0, 1.0)]);
        let nonzero_loss = learner_step(LearnerType::Pegasos, &x, 0.5, 0.0, 0.1, &mut w);

        assert!(nonzero_loss);
        // w was zero, so after regularization the update lands η·y on x.
        assert!(w.inner_product(&x) > 0.0);
    }

    #[test]
    fn test_pegasos_step_skips_confident_example() {
        let mut w = WeightVector::new(1);
        w.add_vector(&pos(&[(0, 1.0)]), 5.0);
        let before = w.inner_product(&pos(&[(0, 1.0)]));

        // Margin is 5 > 1: no gradient step, only regularization shrink.
        let nonzero_loss = learner_step(LearnerType::SgdSvm, &pos(&[(0, 1.0)]), 0.1, 0.0, 0.1, &mut w);
        assert!(!nonzero_loss);
        let after = w.inner_product(&pos(&[(0, 1.0)]));
        assert!((after - before * (1.0 - 0.1 * 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_unlabeled_example_never_steps_svm() {
        let mut w = WeightVector::new(1);
        let x = SparseVector::new(&[(0, 1.0)], 0.0);
        let nonzero_loss = learner_step(LearnerType::SgdSvm, &x, 0.5, 0.0, 0.0, &mut w);
        assert!(!nonzero_loss);
        assert_eq!(w.squared_norm(), 0.0);
    }

    #[test]
    fn test_margin_perceptron_gates_on_c() {
        let mut w = WeightVector::new(1);
        w.add_vector(&pos(&[(0, 1.0)]), 2.0);

        // Margin 2 > c = 1: no update.
        assert!(!learner_step(LearnerType::MarginPerceptron, &pos(&[(0, 1.0)]), 0.5, 1.0, 0.0, &mut w));
        // Margin 2 <= c = 3: update fires.
        assert!(learner_step(LearnerType::MarginPerceptron, &pos(&[(0, 1.0)]), 0.5, 3.0, 0.0, &mut w));
        assert!((w.inner_product(&pos(&[(0, 1.0)])) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_passive_aggressive_step_is_clipped() {
        let mut w = WeightVector::new(1);
        // Loss is 1, ‖x‖² = 0.01, so the raw step 100 must clip at c = 2.
        let x = pos(&[(0, 0.1)]);
        learner_step(LearnerType::PassiveAggressive, &x, 0.0, 2.0, 0.0, &mut w);
        assert!((w.inner_product(&pos(&[(0, 1.0)])) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_passive_aggressive_exact_step_closes_the_loss() {
        let mut w = WeightVector::new(1);
        let x = pos(&[(0, 2.0)]);
        learner_step(LearnerType::PassiveAggressive, &x, 0.0, 100.0, 0.0, &mut w);
        // Unclipped PA lands exactly on the margin.
        assert!((x.y() * w.inner_product(&x) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_romma_update_from_zero_weights() {
        let mut w = WeightVector::new(1);
        // Zero weight vector gives ww = 0; the floored denominators reduce
        // the closed form to c = 1, d = 1, i.e. w becomes x.
        let x = pos(&[(0, 1.0)]);
        let stepped = learner_step(LearnerType::Romma, &x, 0.0, 0.0, 0.0, &mut w);
        assert!(stepped);
        assert!((w.inner_product(&x) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_pegasos_projection_bounds_norm() {
        let mut w = WeightVector::new(1);
        w.add_vector(&pos(&[(0, 1.0)]), 100.0);
        let lambda = 0.25;
        pegasos_projection(lambda, &mut w);
        assert!(
            w.squared_norm() <= 1.0 / lambda + 1e-4,
            "norm {} exceeds ball radius",
            w.squared_norm()
        );
    }

    #[test]
    fn test_pegasos_projection_noop_inside_ball() {
        let mut w = WeightVector::new(1);
        w.add_vector(&pos(&[(0, 1.0)]), 0.5);
        let before = w.squared_norm();
        pegasos_projection(0.1, &mut w);
        assert_eq!(w.squared_norm(), before);
    }

    #[test]
    fn test_l2_regularize_floors_at_min_scaling_factor() {
        let mut w = WeightVector::new(1);
        w.add_vector(&pos(&[(0, 1.0)]), 2.0);
        let before = w.squared_norm();

        // η·λ ≥ 1, so the scale floors at MIN_SCALING_FACTOR.
        l2_regularize(2.0, 1.0, &mut w);
        assert!(w.squared_norm() <= MIN_SCALING_FACTOR * MIN_SCALING_FACTOR * before * 1.0001);
    }

    #[test]
    fn test_l2_regularize_several_steps_applies_single_scale() {
        let mut single = WeightVector::new(1);
        single.add_vector(&pos(&[(0, 1.0)]), 1.0);
        let mut multi = single.clone();

        l2_regularize(0.1, 0.1, &mut single);
        // Composing a benign factor over many steps still issues one scale.
        l2_regularize_several_steps(0.1, 0.1, 5.0, &mut multi);
        assert!((single.squared_norm() - multi.squared_norm()).abs() < 1e-7);
    }

    #[test]
    fn test_rank_step_tie_is_a_noop_for_gated_families() {
        let mut w = WeightVector::new(2);
        let a = pos(&[(0, 1.0)]);
        let b = pos(&[(1, 1.0)]);
        for learner in [LearnerType::Pegasos, LearnerType::SgdSvm, LearnerType::Romma] {
            let stepped = learner_rank_step(learner, &a, &b, 0.5, 0.0, 0.0, &mut w, None, None);
            assert!(!stepped, "{:?} stepped on a tied pair", learner);
        }
        assert_eq!(w.squared_norm(), 0.0);
    }

    #[test]
    fn test_pegasos_rank_step_matches_difference_update() {
        let a = pos(&[(0, 1.0), (1, 0.5)]);
        let b = neg(&[(1, 1.0), (2, 2.0)]);

        let mut w_rank = WeightVector::new(3);
        learner_rank_step(LearnerType::SgdSvm, &a, &b, 0.5, 0.0, 0.0, &mut w_rank, None, None);

        let mut w_diff = WeightVector::new(3);
        let d = SparseVector::difference(&a, &b, 1.0);
        w_diff.add_vector(&d, 0.5);

        for f in 0..3 {
            let probe = SparseVector::new(&[(f, 1.0)], 0.0);
            assert!(
                (w_rank.inner_product(&probe) - w_diff.inner_product(&probe)).abs() < 1e-5,
                "feature {} differs",
                f
            );
        }
    }

    #[test]
    fn test_margin_perceptron_rank_uses_raw_step() {
        let mut w = WeightVector::new(2);
        let a = pos(&[(0, 1.0)]);
        let b = neg(&[(1, 1.0)]);
        learner_rank_step(LearnerType::MarginPerceptron, &a, &b, 0.3, 0.0, 0.0, &mut w, None, None);

        assert!((w.inner_product(&pos(&[(0, 1.0)])) - 0.3).abs() < 1e-6);
        assert!((w.inner_product(&pos(&[(1, 1.0)])) + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_logreg_pegasos_rank_override_labels() {
        let a = pos(&[(0, 1.0)]);
        let b = pos(&[(1, 1.0)]);

        // Same stored labels would tie; the overrides order the pair.
        let mut w = WeightVector::new(2);
        learner_rank_step(
            LearnerType::LogregPegasos,
            &a,
            &b,
            0.5,
            0.0,
            0.01,
            &mut w,
            Some(1.0),
            Some(-1.0),
        );
        assert!(w.inner_product(&pos(&[(0, 1.0)])) > 0.0);
        assert!(w.inner_product(&pos(&[(1, 1.0)])) < 0.0);
    }
}
