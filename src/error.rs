//! Error types for the control loop.
//!
//! Fatal errors (`Session`, `Register`, `Config`) prevent the loop thread
//! from starting. `Io` is non-fatal at runtime: the tick logs it, skips the
//! affected sub-step, and keeps the loop alive. Cancellation is not an
//! error — it is the sole normal termination path.

use thiserror::Error;

use crate::config::ConfigError;
use crate::persist::PersistError;

/// Errors that can occur while setting up or running the control loop.
#[derive(Error, Debug)]
pub enum LoopError {
    /// Hardware session unavailable — fatal, the loop never starts.
    #[error("hardware session unavailable: {0}")]
    Session(String),

    /// Timer/IRQ registration failed — fatal at startup, thread not created.
    #[error("timer registration failed: {0}")]
    Register(String),

    /// A single encoder or analog channel access failed — non-fatal per tick.
    #[error("channel I/O failed: {0}")]
    Io(String),

    /// Precondition violation caught by config validation.
    #[error("configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    /// Capture record could not be handed to the persistence sink.
    #[error("capture persistence failed: {source}")]
    Persist {
        #[from]
        source: PersistError,
    },
}

/// Result type for control loop operations.
pub type LoopResult<T> = Result<T, LoopError>;
