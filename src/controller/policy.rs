//! Target-recall sampling policy.
//!
//! Classical continuous active learning reviews until the corpus is
//! exhausted. With a target of `N` relevant documents and unknown
//! prevalence, this policy instead keeps a doubling horizon `T` — an
//! estimate of the total relevants in the collection. Each refill enqueues
//! only `⌈B·N/T⌉` of the batch, chosen uniformly at random, so review
//! effort concentrates where the recall estimate says it pays off. When
//! the observed relevants catch up with the horizon (`R ≥ T`), the
//! estimate was too low and `T` doubles.

/// Horizon state for the target-recall subsampling rule.
#[derive(Debug, Clone)]
pub struct RecallTarget {
    target: usize,
    horizon: usize,
}

impl RecallTarget {
    /// Start with the horizon at the target itself.
    pub fn new(target: usize) -> Self {
        Self { target, horizon: target }
    }

    /// Double the horizon if the observed relevant count has reached it.
    /// Checked once per refill; returns whether a doubling happened.
    pub fn maybe_double(&mut self, relevant_found: usize) -> bool {
        if relevant_found >= self.horizon {
            self.horizon *= 2;
            true
        } else {
            false
        }
    }

    /// How many of a `batch_size`-candidate refill to actually enqueue:
    /// `⌈B·N/T⌉`.
    pub fn sample_size(&self, batch_size: usize) -> usize {
        (batch_size as u64 * self.target as u64).div_ceil(self.horizon as u64) as usize
    }

    /// Current horizon `T`.
    pub fn horizon(&self) -> usize {
        self.horizon
    }
}

/// Batch growth rule applied after every refill: `B ← B + ⌈B/10⌉`.
pub fn grow_batch(batch_size: usize) -> usize {
    batch_size + batch_size.div_ceil(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_starts_at_target() {
        let policy = RecallTarget::new(10);
        assert_eq!(policy.horizon(), 10);
        // N == T means no subsampling: the full batch is enqueued.
        assert_eq!(policy.sample_size(80), 80);
    }

    #[test]
    fn test_horizon_doubles_exactly_when_reached() {
        let mut policy = RecallTarget::new(10);

        // R climbing toward T: no doubling until R reaches 10.
        for r in 0..10 {
            assert!(!policy.maybe_double(r), "doubled early at R = {}", r);
            assert_eq!(policy.horizon(), 10);
        }

        assert!(policy.maybe_double(10));
        assert_eq!(policy.horizon(), 20);
        assert!(!policy.maybe_double(10), "doubled twice for the same R");
    }

    #[test]
    fn test_horizon_doubles_once_per_check() {
        let mut policy = RecallTarget::new(4);
        // Even if R overshoots past 2T, a single check doubles once.
        assert!(policy.maybe_double(20));
        assert_eq!(policy.horizon(), 8);
    }

    #[test]
    fn test_sample_size_rounds_up() {
        let mut policy = RecallTarget::new(100);
        policy.maybe_double(100); // T = 200
        policy.maybe_double(200); // T = 400
        assert_eq!(policy.horizon(), 400);

        // ⌈80·100/400⌉ = 20
        assert_eq!(policy.sample_size(80), 20);
        // ⌈81·100/400⌉ = ⌈20.25⌉ = 21
        assert_eq!(policy.sample_size(81), 21);
    }

    #[test]
    fn test_batch_growth_sequence() {
        let mut b = 100;
        let mut seen = vec![b];
        for _ in 0..3 {
            b = grow_batch(b);
            seen.push(b);
        }
        assert_eq!(seen, vec![100, 110, 121, 134]);
    }

    #[test]
    fn test_batch_growth_is_monotonic_from_one() {
        let mut b = 1;
        for _ in 0..20 {
            let next = grow_batch(b);
            assert!(next > b, "batch stalled at {}", b);
            b = next;
        }
    }
}
