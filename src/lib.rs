//! recal - continuous active learning for high-recall review
//!
//! The learning-and-sampling core of a CAL engine: given a corpus of
//! documents split into paragraph units, a handful of labeled seed
//! examples, and an assessor answering with relevant / non-relevant
//! judgments, the controller iteratively trains a sparse linear model,
//! scores the corpus, and decides which paragraphs to present next.
//!
//! # Architecture
//!
//! ```text
//! Seed + Judgments → Training View → Pegasos SVM → Parallel Scoring → Top-K
//!        ↑                               ↓                              ↓
//!     assessor  ←──────  judgment queue  ←──────  target-recall subsample
//! ```
//!
//! A target-recall policy makes the loop converge without exhausting the
//! corpus: it keeps a doubling estimate of the total relevants and only
//! presents the slice of each batch that the estimate says is worth the
//! assessor's time.
//!
//! # Determinism
//!
//! A session is a pure function of the corpus, the seed examples, the
//! configuration and the judgment sequence. Training draws and refill
//! shuffles come from one seeded generator; scoring is parallel but
//! consumes no randomness.

pub mod config;
pub mod controller;
pub mod dataset;
pub mod learner;
pub mod types;
pub mod weights;

// Re-export the session-facing types
pub use config::EngineConfig;
pub use controller::BmiController;
pub use dataset::{Dataset, InMemoryDataset, InMemoryParagraphDataset, ParagraphDataset};
pub use learner::{EtaType, LearnerType};
pub use types::{SparseVector, LABEL_DISCARDED, LABEL_NON_RELEVANT, LABEL_RELEVANT};
pub use weights::{WeightVector, MIN_SCALING_FACTOR};
