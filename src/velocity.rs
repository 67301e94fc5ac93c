//! Velocity estimation from a free-running quadrature encoder counter.
//!
//! The counter is an unsigned 32-bit value that wraps at its bit width.
//! Each call consumes the current count and returns the signed per-tick
//! delta in counts; wraparound-safe subtraction makes a wrap across
//! `u32::MAX` indistinguishable from a small forward step. Conversion to
//! physical units is the caller's concern:
//!
//! ```text
//! rpm = delta · 60 / (counts_per_rev · period_s)
//! ```

/// Per-tick velocity estimator.
///
/// Holds the previous raw counter; the first sample establishes the
/// baseline and reports zero motion.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityEstimator {
    prev: Option<u32>,
}

impl VelocityEstimator {
    /// Create an estimator with no baseline.
    pub const fn new() -> Self {
        Self { prev: None }
    }

    /// Consume the current counter value, returning the signed delta in
    /// counts per tick. The first call records the baseline and returns 0.
    #[inline]
    pub fn sample(&mut self, counter: u32) -> i32 {
        let delta = match self.prev {
            Some(prev) => counter.wrapping_sub(prev) as i32,
            None => 0,
        };
        self.prev = Some(counter);
        delta
    }

    /// Drop the baseline; the next sample returns 0 again.
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Convert a per-tick count delta to rpm.
#[inline]
pub fn delta_to_rpm(delta: i32, counts_per_rev: f64, period_s: f64) -> f64 {
    f64::from(delta) * 60.0 / (counts_per_rev * period_s)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_zero() {
        let mut est = VelocityEstimator::new();
        assert_eq!(est.sample(0), 0);

        let mut est = VelocityEstimator::new();
        assert_eq!(est.sample(3_000_000_000), 0);
    }

    #[test]
    fn forward_motion() {
        let mut est = VelocityEstimator::new();
        est.sample(1000);
        assert_eq!(est.sample(3048), 2048);
        assert_eq!(est.sample(3048), 0);
    }

    #[test]
    fn reverse_motion_is_negative() {
        let mut est = VelocityEstimator::new();
        est.sample(5000);
        assert_eq!(est.sample(4200), -800);
    }

    #[test]
    fn wraparound_forward() {
        let mut est = VelocityEstimator::new();
        est.sample(u32::MAX - 10);
        // 11 counts forward across the wrap boundary.
        assert_eq!(est.sample(0), 11);
    }

    #[test]
    fn wraparound_reverse() {
        let mut est = VelocityEstimator::new();
        est.sample(5);
        // 6 counts backward across the wrap boundary.
        assert_eq!(est.sample(u32::MAX), -6);
    }

    #[test]
    fn reset_reestablishes_baseline() {
        let mut est = VelocityEstimator::new();
        est.sample(100);
        est.sample(200);
        est.reset();
        assert_eq!(est.sample(10_000), 0);
        assert_eq!(est.sample(10_100), 100);
    }

    #[test]
    fn rpm_conversion() {
        // 2048 counts in one 5 ms tick on a 2048-count encoder = 1 rev / 5 ms
        // = 200 rev/s = 12000 rpm.
        let rpm = delta_to_rpm(2048, 2048.0, 0.005);
        assert!((rpm - 12_000.0).abs() < 1e-9);
    }
}
