//! Biquad cascade: chained second-order IIR sections (Direct Form I).
//!
//! Each stage evaluates the difference equation
//!
//! ```text
//! y = (b0·x0 + b1·x1 + b2·x2 − a1·y1 − a2·y2) / a0
//! ```
//!
//! and shifts its histories. Stage i's output feeds stage i+1's input;
//! the final output is clamped to the caller's saturation range.
//! Evaluation is deterministic, allocation-free, and mutates histories
//! in place. Coefficients may be rewritten between evaluations to realize
//! a time-varying filter; histories are left untouched by such rewrites.

/// Maximum number of second-order sections in a cascade.
pub const MAX_STAGES: usize = 4;

/// One second-order IIR section.
///
/// Coefficients are public so the caller can overwrite them between
/// evaluations (the PI law does this every tick). Histories are private
/// and only mutated by [`BiquadStage::advance`].
///
/// Caller precondition: `a0 != 0` — validated at configuration time,
/// not checked on the hot path.
#[derive(Debug, Clone, Copy)]
pub struct BiquadStage {
    /// Numerator coefficients.
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients (`a0` must be nonzero).
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,

    // Input history: x[n], x[n-1], x[n-2].
    x0: f64,
    x1: f64,
    x2: f64,
    // Output history: y[n-1], y[n-2] (unsaturated).
    y1: f64,
    y2: f64,
}

impl BiquadStage {
    /// Create a stage with the given coefficients and zero histories.
    pub const fn new(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0,
            b1,
            b2,
            a0,
            a1,
            a2,
            x0: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Zero all histories, preserving coefficients.
    #[inline]
    pub fn reset(&mut self) {
        self.x0 = 0.0;
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Evaluate one sample through this stage and shift histories.
    #[inline]
    pub fn advance(&mut self, input: f64) -> f64 {
        self.x0 = input;
        let y = (self.b0 * self.x0 + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2)
            / self.a0;

        self.x2 = self.x1;
        self.x1 = self.x0;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }
}

/// Ordered chain of biquad stages, owned exclusively by the control thread.
#[derive(Debug, Clone, Default)]
pub struct FilterCascade {
    stages: heapless::Vec<BiquadStage, MAX_STAGES>,
}

impl FilterCascade {
    /// Build a cascade from the given stages.
    ///
    /// Returns `None` if more than [`MAX_STAGES`] stages are supplied.
    pub fn from_stages(stages: &[BiquadStage]) -> Option<Self> {
        let stages = heapless::Vec::from_slice(stages).ok()?;
        Some(Self { stages })
    }

    /// Number of stages.
    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when the cascade has no stages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Mutable access to one stage, for in-place coefficient updates.
    #[inline]
    pub fn stage_mut(&mut self, index: usize) -> &mut BiquadStage {
        &mut self.stages[index]
    }

    /// Zero every stage's histories.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Evaluate one input sample through all stages in order, then clamp
    /// the final output to `[ymin, ymax]`.
    ///
    /// Histories shift with the unsaturated per-stage outputs; only the
    /// returned value is clamped.
    #[inline]
    pub fn evaluate(&mut self, input: f64, ymin: f64, ymax: f64) -> f64 {
        let mut y = input;
        for stage in &mut self.stages {
            y = stage.advance(y);
        }
        y.clamp(ymin, ymax)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
