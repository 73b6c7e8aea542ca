//! The continuous active learning control loop.
//!
//! `BmiController` owns a review session: it trains a fresh linear model
//! from the accumulated judgments, scores every paragraph in the corpus,
//! queues the best unjudged candidates for the assessor, and folds returned
//! judgments back in. When the queue drains, the target-recall policy
//! decides how much of the next batch is actually presented.
//!
//! ```text
//! labeled cache ──► train (Pegasos SVM) ──► score paragraphs (threads)
//!       ▲                                        │
//!       │                                        ▼
//!  judgments ◄── assessor ◄── judgment queue ◄── top-K + subsample
//! ```
//!
//! Concurrency contract: one mutex guards the whole session state and is
//! held across a refill, training included. No judgment can land while the
//! model retrains, so the queue never references a stale candidate set.
//! Scoring inside the refill fans out over worker threads against the
//! read-only corpus and weight vector.

mod policy;

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dataset::{Dataset, ParagraphDataset};
use crate::learner::loops::stochastic_outer_loop;
use crate::learner::{EtaType, LearnerType};
use crate::types::{SparseVector, LABEL_DISCARDED};
use crate::weights::WeightVector;

use policy::{grow_batch, RecallTarget};

/// A scored paragraph competing for a queue slot. Orders by score, ties
/// broken toward the lower unit id.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    unit: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.unit.cmp(&self.unit))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Mutable session state, guarded by the judgment mutex.
struct SessionState {
    /// Labeled cache: judged documents carry `±1`; paragraphs the sampler
    /// discarded carry `LABEL_DISCARDED`. Ordered so the training view is
    /// deterministic for a given seed.
    judgments: BTreeMap<usize, i32>,
    /// Paragraph units currently presented to the assessor, in
    /// presentation order.
    judgment_queue: Vec<usize>,
    policy: RecallTarget,
    /// Current batch size `B`.
    batch_size: usize,
    /// Snapshot of `B` taken when the running iteration started.
    judgments_per_iteration: usize,
    /// Relevant judgments observed (`R`).
    relevant_found: usize,
    iteration: usize,
    rng: StdRng,
}

/// Controller for one review session over a fixed corpus.
pub struct BmiController {
    documents: Arc<dyn Dataset>,
    paragraphs: Arc<dyn ParagraphDataset>,
    config: EngineConfig,
    seed: Vec<SparseVector>,
    dimensions: usize,
    state: Mutex<SessionState>,
}

impl BmiController {
    /// Start a session: validates the configuration, trains a first model
    /// from the seed examples (plus random negatives) and fills the queue
    /// with the full top candidate batch.
    pub fn new(
        seed: Vec<SparseVector>,
        documents: Arc<dyn Dataset>,
        paragraphs: Arc<dyn ParagraphDataset>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        if documents.size() == 0 {
            anyhow::bail!("document dataset is empty");
        }
        if paragraphs.size() == 0 {
            anyhow::bail!("paragraph dataset is empty");
        }

        let dimensions = documents.num_features().max(paragraphs.num_features());
        let state = SessionState {
            judgments: BTreeMap::new(),
            judgment_queue: Vec::new(),
            policy: RecallTarget::new(config.target_relevants),
            batch_size: config.batch_size,
            judgments_per_iteration: config.batch_size,
            relevant_found: 0,
            iteration: 0,
            rng: StdRng::seed_from_u64(config.session_seed),
        };

        let controller = Self { documents, paragraphs, config, seed, dimensions, state: Mutex::new(state) };

        // The first fill is not subsampled: present the full top batch,
        // then start growing B.
        {
            let mut state = controller.lock_state();
            let batch = controller.perform_training_iteration(&mut state);
            state.judgment_queue.extend(batch);
            state.batch_size = grow_batch(state.batch_size);
        }

        Ok(controller)
    }

    /// Fold a batch of assessor judgments into the session, in input
    /// order. Labels are `+1` (relevant) or `-1` (non-relevant); keys that
    /// resolve to no document are logged and skipped. If the judgment
    /// queue drains, the refill (a full training iteration) runs before
    /// this returns.
    pub fn record_judgment_batch(&self, judgments: &[(String, i32)]) {
        let mut state = self.lock_state();

        for (key, label) in judgments {
            let Some(document) = self.documents.get_index(key) else {
                warn!(key = key.as_str(), "judgment for unknown document key, skipping");
                continue;
            };
            state.judgments.insert(document, *label);

            // Tail-to-head scan, consuming a single queue entry per
            // judgment. Other queued paragraphs of the same document stay,
            // keeping their own chance of being presented.
            for qi in (0..state.judgment_queue.len()).rev() {
                if self.paragraphs.translate_index(state.judgment_queue[qi]) == document {
                    state.judgment_queue.remove(qi);
                    if *label > 0 {
                        state.relevant_found += 1;
                    }
                    break;
                }
            }
        }

        if state.judgment_queue.is_empty() {
            self.refill(&mut state);
        }
    }

    /// The paragraphs currently awaiting judgment, resolved to their
    /// parent document keys, in presentation order.
    pub fn get_current_batch(&self) -> Vec<String> {
        let state = self.lock_state();
        state
            .judgment_queue
            .iter()
            .map(|&p| self.documents.key_at(self.paragraphs.translate_index(p)).to_string())
            .collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retrain from the cache and refill the queue with a subsampled slice
    /// of the next candidate batch.
    fn refill(&self, state: &mut SessionState) {
        info!(relevant_found = state.relevant_found, "refreshing judgment queue");
        if state.policy.maybe_double(state.relevant_found) {
            info!(horizon = state.policy.horizon(), "doubling sampling horizon");
        }
        debug!(batch_size = state.batch_size, "starting refill iteration");

        state.judgments_per_iteration = state.batch_size;
        let mut batch = self.perform_training_iteration(state);

        let sample_size = state.policy.sample_size(state.batch_size);
        debug!(candidates = batch.len(), sample_size, "subsampling refill batch");
        batch.shuffle(&mut state.rng);
        for (i, unit) in batch.into_iter().enumerate() {
            if i < sample_size {
                state.judgment_queue.push(unit);
            } else {
                state.judgments.insert(unit, LABEL_DISCARDED);
            }
        }

        state.batch_size = grow_batch(state.batch_size);
    }

    /// Train a fresh model on the current labeled view and return the
    /// top-scoring eligible paragraphs, best first.
    fn perform_training_iteration(&self, state: &mut SessionState) -> Vec<usize> {
        state.iteration += 1;
        let training = self.build_training_view(state);

        let mut w = WeightVector::new(self.dimensions);
        stochastic_outer_loop(
            &training,
            LearnerType::Pegasos,
            EtaType::Pegasos,
            self.config.lambda,
            0.0,
            self.config.training_iterations,
            &mut w,
            &mut state.rng,
        );
        debug!(iteration = state.iteration, examples = training.len(), "trained model");

        self.select_candidates(&w, &state.judgments, state.judgments_per_iteration)
    }

    /// Seed examples, judged documents relabeled from the cache, and a
    /// draw of random unjudged documents treated as negatives.
    fn build_training_view(&self, state: &mut SessionState) -> Vec<SparseVector> {
        let mut training = self.seed.clone();

        for (&document, &label) in &state.judgments {
            if label == LABEL_DISCARDED {
                continue;
            }
            let y = if label > 0 { 1.0 } else { -1.0 };
            training.push(self.documents.vector_at(document).relabeled(y));
        }

        for _ in 0..self.config.random_negatives {
            let document = state.rng.gen_range(0..self.documents.size());
            if state.judgments.contains_key(&document) {
                continue;
            }
            training.push(self.documents.vector_at(document).relabeled(-1.0));
        }

        training
    }

    /// Score every paragraph against `w` across the worker pool and keep
    /// the best `k` that are neither labeled nor children of a judged
    /// document. Each worker reduces its slice to a local top-K; the
    /// merge is serial.
    fn select_candidates(&self, w: &WeightVector, judgments: &BTreeMap<usize, i32>, k: usize) -> Vec<usize> {
        let num_units = self.paragraphs.size();
        if k == 0 {
            return Vec::new();
        }

        let num_threads = self.config.num_threads.min(num_units).max(1);
        let chunk_size = num_units.div_ceil(num_threads);
        let paragraphs = self.paragraphs.as_ref();
        let merged = Mutex::new(Vec::with_capacity(num_threads * k));

        std::thread::scope(|scope| {
            for t in 0..num_threads {
                let lo = t * chunk_size;
                let hi = ((t + 1) * chunk_size).min(num_units);
                let merged = &merged;
                scope.spawn(move || {
                    let mut top: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(k + 1);
                    for unit in lo..hi {
                        if judgments.contains_key(&unit) {
                            continue;
                        }
                        if judgments.contains_key(&paragraphs.translate_index(unit)) {
                            continue;
                        }
                        let score = w.inner_product(paragraphs.vector_at(unit));
                        top.push(Reverse(Candidate { score, unit }));
                        if top.len() > k {
                            top.pop();
                        }
                    }
                    let mut partial: Vec<Candidate> = top.into_iter().map(|Reverse(c)| c).collect();
                    if let Ok(mut merged) = merged.lock() {
                        merged.append(&mut partial);
                    }
                });
            }
        });

        let mut all = merged.into_inner().unwrap_or_else(PoisonError::into_inner);
        all.sort_by(|a, b| b.cmp(a));
        all.truncate(k);
        all.into_iter().map(|c| c.unit).collect()
    }
}
