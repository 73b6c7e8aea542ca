//! Lazily scaled dense weight vector.
//!
//! L2 regularization multiplies every coordinate by `(1 - η·λ)` on every
//! stochastic step. Doing that densely is O(d) per step; carrying a scalar
//! scale factor makes a step O(nnz(x)) instead. The logical value of
//! coordinate `i` is always `scale * raw[i]`, and the squared norm is kept
//! in closed form across every mutation.
//!
//! The raw array is private on purpose. Callers interact only through
//! `inner_product`, `scale_by` and `add_vector`, which preserve the
//! `squared_norm == scale² · Σ raw[i]²` invariant.

use crate::types::SparseVector;

/// Floor protecting the scale factor against `λ·η > 1` combinations, which
/// would otherwise break regularization and the Pegasos projection.
pub const MIN_SCALING_FACTOR: f32 = 1e-7;

/// Dense weight vector with a lazy scale factor.
///
/// Created zeroed at the start of each training pass and discarded when the
/// iteration ends. Grows to the highest feature id seen if an example
/// exceeds the initial dimensionality.
#[derive(Debug, Clone)]
pub struct WeightVector {
    raw: Vec<f32>,
    scale: f64,
    squared_norm: f64,
}

impl WeightVector {
    /// A zero vector of the given dimensionality, with scale 1.
    pub fn new(dimensions: usize) -> Self {
        Self {
            raw: vec![0.0; dimensions],
            scale: 1.0,
            squared_norm: 0.0,
        }
    }

    /// `w · x` over the logical (scaled) weights.
    pub fn inner_product(&self, x: &SparseVector) -> f32 {
        let mut sum = 0.0f64;
        for (f, v) in x.iter() {
            if let Some(&w) = self.raw.get(f as usize) {
                sum += w as f64 * v as f64;
            }
        }
        (self.scale * sum) as f32
    }

    /// `w · (a - b)`, evaluated as the difference of the two products.
    pub fn inner_product_on_difference(&self, a: &SparseVector, b: &SparseVector) -> f32 {
        self.inner_product(a) - self.inner_product(b)
    }

    /// Multiply the whole vector by `alpha` in O(1) via the scale factor.
    ///
    /// When `|scale|` drops below `MIN_SCALING_FACTOR` the scale is folded
    /// into the raw array, so `add_vector` never divides by a vanishing
    /// scale. `scale_by(0.0)` therefore zeroes the vector and resets the
    /// scale to 1.
    pub fn scale_by(&mut self, alpha: f32) {
        let alpha = alpha as f64;
        self.squared_norm *= alpha * alpha;
        self.scale *= alpha;
        if self.scale.abs() < MIN_SCALING_FACTOR as f64 {
            self.flush_scale();
        }
    }

    /// `w += x_scale · x`, updating the cached squared norm in closed form:
    /// the norm delta is `‖x‖²·x_scale² + 2·x_scale·(w·x)`.
    pub fn add_vector(&mut self, x: &SparseVector, x_scale: f32) {
        let mut inner = 0.0f64;
        for (f, v) in x.iter() {
            let f = f as usize;
            if f >= self.raw.len() {
                self.raw.resize(f + 1, 0.0);
            }
            let xi = (v * x_scale) as f64;
            inner += self.raw[f] as f64 * xi;
            self.raw[f] += (xi / self.scale) as f32;
        }
        let x_scale = x_scale as f64;
        self.squared_norm += x.squared_norm() as f64 * x_scale * x_scale + 2.0 * self.scale * inner;
    }

    /// Cached `‖w‖²` of the logical weights.
    pub fn squared_norm(&self) -> f32 {
        self.squared_norm as f32
    }

    /// Current dimensionality of the dense array.
    pub fn dimensions(&self) -> usize {
        self.raw.len()
    }

    fn flush_scale(&mut self) {
        let s = self.scale as f32;
        for w in &mut self.raw {
            *w *= s;
        }
        self.scale = 1.0;
    }
}
