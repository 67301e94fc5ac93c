//! # Velocity Control Unit
//!
//! Periodic, interrupt-driven PI control of a DC motor's rotational
//! velocity. Each timer tick samples a quadrature encoder, estimates
//! velocity, runs a biquad cascade realizing a Tustin-discretized PI law
//! whose coefficients are recomputed from live-tunable gains, drives an
//! analog actuator, and logs a bounded step-response window.
//!
//! ## Concurrency
//!
//! Two actors: the control thread (owns all hardware handles, the filter
//! cascade, the velocity estimator, and the capture buffer) and an editor
//! thread mutating tunable parameter-table entries. Only the parameter
//! table and the cancellation token cross the thread boundary, and both
//! are per-entry atomic — no coarse lock ever sits on the real-time path.
//!
//! ## Zero-Allocation Tick
//!
//! All loop state is pre-allocated at startup; the tick performs no heap
//! allocation and blocks only at the timer wait.

pub mod capture;
pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod hal;
pub mod params;
pub mod persist;
pub mod squarewave;
pub mod velocity;
