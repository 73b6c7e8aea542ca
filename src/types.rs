//! Core feature-vector type and judgment labels.
//!
//! A `SparseVector` is the atom everything else is built from: corpus units
//! (documents and paragraphs) are loaded as sparse feature vectors once and
//! never mutated afterward, so they can be shared freely across the scoring
//! threads. Key design decisions:
//! - Feature ids are kept strictly ascending so inner products and pairwise
//!   differences reduce to sorted merges
//! - The squared norm is cached at construction (the passive-aggressive
//!   learner divides by it on every step)
//! - The label rides along with the vector, `0.0` meaning unlabeled

use serde::{Deserialize, Serialize};

/// Judgment label for a unit the assessor marked relevant.
pub const LABEL_RELEVANT: i32 = 1;
/// Judgment label for a unit the assessor marked non-relevant.
pub const LABEL_NON_RELEVANT: i32 = -1;
/// Sentinel for a unit the refill policy sampled but chose not to present.
/// Suppresses the unit from all future candidate selection without ever
/// entering the training view.
pub const LABEL_DISCARDED: i32 = -2;

/// Immutable sparse feature vector with an attached label.
///
/// Feature ids are unique and strictly ascending; values are parallel to
/// them. The label `y` is `+1.0` / `-1.0` for judged examples and `0.0`
/// for unlabeled corpus units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    features: Vec<u32>,
    values: Vec<f32>,
    y: f32,
    squared_norm: f32,
}

impl SparseVector {
    /// Build a vector from (feature id, value) pairs. Pairs are sorted by
    /// feature id; ids must be unique.
    pub fn new(pairs: &[(u32, f32)], y: f32) -> Self {
        let mut pairs = pairs.to_vec();
        pairs.sort_by_key(|&(f, _)| f);
        debug_assert!(
            pairs.windows(2).all(|w| w[0].0 < w[1].0),
            "duplicate feature ids in sparse vector"
        );

        let features: Vec<u32> = pairs.iter().map(|&(f, _)| f).collect();
        let values: Vec<f32> = pairs.iter().map(|&(_, v)| v).collect();
        let squared_norm = values.iter().map(|v| v * v).sum();

        Self { features, values, y, squared_norm }
    }

    /// Materialize `a - b` as a sparse vector via a merge over the two
    /// sorted feature lists. Used by the pairwise ROMMA step, which reuses
    /// the pointwise update on the difference vector.
    pub fn difference(a: &SparseVector, b: &SparseVector, y: f32) -> Self {
        let mut features = Vec::with_capacity(a.features.len() + b.features.len());
        let mut values = Vec::with_capacity(a.features.len() + b.features.len());

        let (mut i, mut j) = (0, 0);
        while i < a.features.len() || j < b.features.len() {
            let fa = a.features.get(i).copied().unwrap_or(u32::MAX);
            let fb = b.features.get(j).copied().unwrap_or(u32::MAX);
            if fa < fb {
                features.push(fa);
                values.push(a.values[i]);
                i += 1;
            } else if fb < fa {
                features.push(fb);
                values.push(-b.values[j]);
                j += 1;
            } else {
                features.push(fa);
                values.push(a.values[i] - b.values[j]);
                i += 1;
                j += 1;
            }
        }

        let squared_norm = values.iter().map(|v| v * v).sum();
        Self { features, values, y, squared_norm }
    }

    /// Squared norm of `a - b` computed by the same merge, without
    /// materializing the difference. The passive-aggressive rank step
    /// divides by this.
    pub fn difference_squared_norm(a: &SparseVector, b: &SparseVector) -> f32 {
        let mut squared_norm = 0.0f32;
        let (mut i, mut j) = (0, 0);
        while i < a.features.len() || j < b.features.len() {
            let fa = a.features.get(i).copied().unwrap_or(u32::MAX);
            let fb = b.features.get(j).copied().unwrap_or(u32::MAX);
            if fa < fb {
                squared_norm += a.values[i] * a.values[i];
                i += 1;
            } else if fb < fa {
                squared_norm += b.values[j] * b.values[j];
                j += 1;
            } else {
                let d = a.values[i] - b.values[j];
                squared_norm += d * d;
                i += 1;
                j += 1;
            }
        }
        squared_norm
    }

    /// Copy of this vector carrying a different label. Corpus vectors are
    /// stored unlabeled; the training view relabels them from the cache.
    pub fn relabeled(&self, y: f32) -> Self {
        let mut copy = self.clone();
        copy.y = y;
        copy
    }

    /// Number of nonzero features.
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Feature id at position `i` in the sorted list.
    pub fn feature_at(&self, i: usize) -> u32 {
        self.features[i]
    }

    /// Value at position `i` in the sorted list.
    pub fn value_at(&self, i: usize) -> f32 {
        self.values[i]
    }

    /// The label: `+1.0`, `-1.0`, or `0.0` for unlabeled.
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Cached `Σ v²`.
    pub fn squared_norm(&self) -> f32 {
        self.squared_norm
    }

    /// Iterate (feature id, value) pairs in ascending feature order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.features.iter().copied().zip(self.values.iter().copied())
    }
}
