//! Bilinear (Tustin) discretization of a continuous PI law onto one
//! biquad stage.
//!
//! ```text
//! b0 = Kp + Ki·T/2
//! b1 = −Kp + Ki·T/2
//! a  = (1, −1, 0)        (pure integrator form)
//! ```
//!
//! The denominator is fixed; only the numerator depends on the gains and
//! the sample period, so live gain changes reduce to rewriting `b0`/`b1`
//! in place while the stage's histories carry the integrator state across
//! the change.

use super::biquad::BiquadStage;

/// Numerator coefficients for the PI stage at the given gains and period.
#[inline]
pub fn pi_coefficients(kp: f64, ki: f64, period_s: f64) -> (f64, f64) {
    let half = ki * period_s / 2.0;
    (kp + half, -kp + half)
}

/// A fresh PI stage with zero numerator and the fixed integrator
/// denominator. Coefficients are filled in on the first tick.
pub fn pi_stage() -> BiquadStage {
    BiquadStage::new(0.0, 0.0, 0.0, 1.0, -1.0, 0.0)
}

/// Overwrite a stage's numerator from live gains, leaving histories and
/// the denominator untouched.
#[inline]
pub fn update_pi_stage(stage: &mut BiquadStage, kp: f64, ki: f64, period_s: f64) {
    let (b0, b1) = pi_coefficients(kp, ki, period_s);
    stage.b0 = b0;
    stage.b1 = b1;
}

// ─── Tests ──────────────────────────────────────────────────────────
