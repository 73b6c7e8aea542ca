//! Session configuration.
//!
//! All knobs of a review session live in one struct with serde support, so
//! a front-end can deserialize them from its own config file:
//!
//! ```toml
//! session-seed = 42
//! num-threads = 8
//! training-iterations = 200000
//! target-relevants = 50
//! batch-size = 100
//! ```
//!
//! `validate()` enforces the settings that would otherwise corrupt a
//! session; construction of a controller fails before any state is touched.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tunable parameters of a review session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Seed for the session RNG. Two sessions with the same seed, corpus
    /// and judgment sequence produce identical training traces.
    pub session_seed: u64,

    /// Worker threads for scoring the corpus. Training itself is
    /// single-threaded.
    pub num_threads: usize,

    /// Stochastic steps per training pass.
    pub training_iterations: usize,

    /// Target number of relevant documents (`N`). Drives the sampling
    /// horizon; must be nonzero.
    pub target_relevants: usize,

    /// Initial judgment batch size (`B`). Grows ~10% per refill.
    pub batch_size: usize,

    /// Unjudged documents drawn uniformly per training pass and treated as
    /// negatives.
    pub random_negatives: usize,

    /// L2 regularization strength for the SVM.
    pub lambda: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_seed: 1,
            num_threads: 8,
            training_iterations: 200_000,
            target_relevants: 50,
            batch_size: 100,
            random_negatives: 100,
            lambda: 0.0001,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that cannot drive a session.
    pub fn validate(&self) -> Result<()> {
        if self.target_relevants == 0 {
            anyhow::bail!("target-relevants must be nonzero: nothing would ever be enqueued");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch-size must be nonzero");
        }
        if self.training_iterations == 0 {
            anyhow::bail!("training-iterations must be nonzero");
        }
        if self.num_threads == 0 {
            anyhow::bail!("num-threads must be nonzero");
        }
        if self.lambda <= 0.0 {
            anyhow::bail!("lambda must be positive (the Pegasos schedule divides by it)");
        }
        Ok(())
    }
}
