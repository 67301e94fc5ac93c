//! Control law building blocks.
//!
//! `biquad` holds the second-order-section IIR evaluator; `pi` maps
//! continuous PI gains onto a single biquad stage via the bilinear
//! (Tustin) discretization. The orchestrator rewrites the PI stage's
//! coefficients every tick, so the cascade realizes a time-varying law.

pub mod biquad;
pub mod pi;
