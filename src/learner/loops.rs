//! Stochastic outer loops driving the single-step learners.
//!
//! Every loop takes its generator explicitly. There is no process-wide RNG:
//! the controller owns one seeded generator per session, which makes a
//! training trace reproducible from the seed alone.
//!
//! The step index handed to the eta schedule is 1-based across the whole
//! pass, so `PegasosEta` starts at `1/λ` rather than dividing by zero.

use rand::Rng;

use super::{eta_value, learner_rank_step, learner_step, EtaType, LearnerType};
use crate::types::SparseVector;
use crate::weights::WeightVector;

/// Uniform stochastic training: one random example per step.
#[allow(clippy::too_many_arguments)]
pub fn stochastic_outer_loop(
    training_set: &[SparseVector],
    learner: LearnerType,
    eta_type: EtaType,
    lambda: f32,
    c: f32,
    num_iters: usize,
    w: &mut WeightVector,
    rng: &mut impl Rng,
) {
    if training_set.is_empty() {
        return;
    }
    for i in 1..=num_iters {
        let x = &training_set[rng.gen_range(0..training_set.len())];
        let eta = eta_value(eta_type, lambda, i);
        learner_step(learner, x, eta, c, lambda, w);
    }
}

/// Class-balanced training: per step, one random positive and one random
/// negative, one pointwise step each. Returns without training when either
/// class is absent.
#[allow(clippy::too_many_arguments)]
pub fn balanced_stochastic_outer_loop(
    training_set: &[SparseVector],
    learner: LearnerType,
    eta_type: EtaType,
    lambda: f32,
    c: f32,
    num_iters: usize,
    w: &mut WeightVector,
    rng: &mut impl Rng,
) {
    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for (i, x) in training_set.iter().enumerate() {
        if x.y() > 0.0 {
            positives.push(i);
        } else {
            negatives.push(i);
        }
    }
    if positives.is_empty() || negatives.is_empty() {
        return;
    }

    for i in 1..=num_iters {
        let eta = eta_value(eta_type, lambda, i);

        let pos_x = &training_set[positives[rng.gen_range(0..positives.len())]];
        learner_step(learner, pos_x, eta, c, lambda, w);

        let neg_x = &training_set[negatives[rng.gen_range(0..negatives.len())]];
        learner_step(learner, neg_x, eta, c, lambda, w);
    }
}

/// ROC-area training: per step, one random positive and one random
/// negative combined in a single pairwise rank step.
#[allow(clippy::too_many_arguments)]
pub fn stochastic_roc_loop(
    positives: &[&SparseVector],
    negatives: &[&SparseVector],
    learner: LearnerType,
    eta_type: EtaType,
    lambda: f32,
    c: f32,
    num_iters: usize,
    w: &mut WeightVector,
    rng: &mut impl Rng,
) {
    if positives.is_empty() || negatives.is_empty() {
        return;
    }
    for i in 1..=num_iters {
        let eta = eta_value(eta_type, lambda, i);
        let pos_x = positives[rng.gen_range(0..positives.len())];
        let neg_x = negatives[rng.gen_range(0..negatives.len())];
        learner_rank_step(learner, pos_x, neg_x, eta, c, lambda, w, Some(1.0), Some(-1.0));
    }
}

/// Mixed objective: with probability `rank_step_probability` take a
/// pairwise rank step on a random positive/negative pair, otherwise a
/// uniform classification step.
#[allow(clippy::too_many_arguments)]
pub fn stochastic_classification_and_roc_loop(
    training_set: &[SparseVector],
    learner: LearnerType,
    eta_type: EtaType,
    lambda: f32,
    c: f32,
    rank_step_probability: f32,
    num_iters: usize,
    w: &mut WeightVector,
    rng: &mut impl Rng,
) {
    if training_set.is_empty() {
        return;
    }
    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for (i, x) in training_set.iter().enumerate() {
        if x.y() > 0.0 {
            positives.push(i);
        } else {
            negatives.push(i);
        }
    }
    let can_rank = !positives.is_empty() && !negatives.is_empty();

    for i in 1..=num_iters {
        let eta = eta_value(eta_type, lambda, i);
        if can_rank && rng.gen::<f32>() < rank_step_probability {
            let pos_x = &training_set[positives[rng.gen_range(0..positives.len())]];
            let neg_x = &training_set[negatives[rng.gen_range(0..negatives.len())]];
            learner_rank_step(learner, pos_x, neg_x, eta, c, lambda, w, None, None);
        } else {
            let x = &training_set[rng.gen_range(0..training_set.len())];
            learner_step(learner, x, eta, c, lambda, w);
        }
    }
}

/// Raw SVM decision value for one example.
pub fn svm_prediction(w: &WeightVector, x: &SparseVector) -> f32 {
    w.inner_product(x)
}

/// Logistic probability estimate for one example.
pub fn logistic_prediction(w: &WeightVector, x: &SparseVector) -> f32 {
    let p = w.inner_product(x);
    p.exp() / (1.0 + p.exp())
}

/// Regularized hinge objective: `λ/2·‖w‖² + mean hinge loss`.
pub fn svm_objective(training_set: &[SparseVector], w: &WeightVector, lambda: f32) -> f32 {
    let mut objective = w.squared_norm() * lambda / 2.0;
    for x in training_set {
        let loss = 1.0 - w.inner_product(x) * x.y();
        if loss > 0.0 {
            objective += loss / training_set.len() as f32;
        }
    }
    objective
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 100 points in the unit square labeled by the sign of `x₁ - x₂`.
    fn diagonal_dataset(rng: &mut StdRng) -> Vec<SparseVector> {
        (0..100)
            .map(|_| {
                let x1: f32 = rng.gen();
                let x2: f32 = rng.gen();
                let y = if x1 - x2 >= 0.0 { 1.0 } else { -1.0 };
                SparseVector::new(&[(0, x1), (1, x2)], y)
            })
            .collect()
    }

    fn training_accuracy(data: &[SparseVector], w: &WeightVector) -> usize {
        data.iter()
            .filter(|x| w.inner_product(x) * x.y() > 0.0)
            .count()
    }

    #[test]
    fn test_pegasos_separates_diagonal_dataset() {
        let mut rng = StdRng::seed_from_u64(1);
        let data = diagonal_dataset(&mut rng);

        let mut w = WeightVector::new(2);
        stochastic_outer_loop(
            &data,
            LearnerType::Pegasos,
            EtaType::Pegasos,
            0.1,
            0.0,
            1000,
            &mut w,
            &mut rng,
        );

        let correct = training_accuracy(&data, &w);
        assert!(correct >= 95, "only {}/100 training examples correct", correct);
    }

    #[test]
    fn test_training_lowers_svm_objective() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = diagonal_dataset(&mut rng);

        let w0 = WeightVector::new(2);
        let initial = svm_objective(&data, &w0, 0.1);

        let mut w = WeightVector::new(2);
        stochastic_outer_loop(
            &data,
            LearnerType::Pegasos,
            EtaType::Pegasos,
            0.1,
            0.0,
            1000,
            &mut w,
            &mut rng,
        );
        let trained = svm_objective(&data, &w, 0.1);
        assert!(trained < initial, "objective went {} -> {}", initial, trained);
    }

    #[test]
    fn test_balanced_loop_handles_missing_class() {
        let data = vec![SparseVector::new(&[(0, 1.0)], 1.0)];
        let mut w = WeightVector::new(1);
        let mut rng = StdRng::seed_from_u64(3);
        balanced_stochastic_outer_loop(
            &data,
            LearnerType::SgdSvm,
            EtaType::Basic,
            0.1,
            0.0,
            100,
            &mut w,
            &mut rng,
        );
        assert_eq!(w.squared_norm(), 0.0, "loop must not train without both classes");
    }

    #[test]
    fn test_balanced_loop_separates() {
        let mut rng = StdRng::seed_from_u64(11);
        let data = diagonal_dataset(&mut rng);

        let mut w = WeightVector::new(2);
        balanced_stochastic_outer_loop(
            &data,
            LearnerType::SgdSvm,
            EtaType::Basic,
            0.01,
            0.0,
            500,
            &mut w,
            &mut rng,
        );
        let correct = training_accuracy(&data, &w);
        assert!(correct >= 90, "only {}/100 training examples correct", correct);
    }

    #[test]
    fn test_roc_loop_orders_positives_above_negatives() {
        let mut rng = StdRng::seed_from_u64(5);
        let data = diagonal_dataset(&mut rng);
        let positives: Vec<&SparseVector> = data.iter().filter(|x| x.y() > 0.0).collect();
        let negatives: Vec<&SparseVector> = data.iter().filter(|x| x.y() < 0.0).collect();

        let mut w = WeightVector::new(2);
        stochastic_roc_loop(
            &positives,
            &negatives,
            LearnerType::Pegasos,
            EtaType::Pegasos,
            0.1,
            0.0,
            1000,
            &mut w,
            &mut rng,
        );

        // Mean positive score should clear mean negative score.
        let mean = |xs: &[&SparseVector]| {
            xs.iter().map(|x| w.inner_product(x)).sum::<f32>() / xs.len() as f32
        };
        assert!(mean(&positives) > mean(&negatives));
    }

    #[test]
    fn test_mixed_loop_trains() {
        let mut rng = StdRng::seed_from_u64(13);
        let data = diagonal_dataset(&mut rng);

        let mut w = WeightVector::new(2);
        stochastic_classification_and_roc_loop(
            &data,
            LearnerType::Pegasos,
            EtaType::Pegasos,
            0.1,
            0.0,
            0.5,
            1000,
            &mut w,
            &mut rng,
        );
        let correct = training_accuracy(&data, &w);
        assert!(correct >= 90, "only {}/100 training examples correct", correct);
    }

    #[test]
    fn test_logistic_prediction_is_a_probability() {
        let mut w = WeightVector::new(1);
        w.add_vector(&SparseVector::new(&[(0, 1.0)], 0.0), 2.0);

        let x = SparseVector::new(&[(0, 1.0)], 1.0);
        let p = logistic_prediction(&w, &x);
        assert!(p > 0.5 && p < 1.0, "prediction {} out of range", p);
    }

    #[test]
    fn test_empty_training_set_is_a_noop() {
        let mut w = WeightVector::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        stochastic_outer_loop(
            &[],
            LearnerType::Pegasos,
            EtaType::Pegasos,
            0.1,
            0.0,
            100,
            &mut w,
            &mut rng,
        );
        assert_eq!(w.squared_norm(), 0.0);
    }
}
