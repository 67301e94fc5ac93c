//! Capture persistence: the shutdown handoff record and its sink.
//!
//! The orchestrator drains the step capture exactly once, at loop exit,
//! and hands a [`CaptureRecord`] to whatever [`CaptureSink`] it was
//! constructed with. `JsonFileSink` is the production sink;
//! `MemorySink` retains records in memory for tests and diagnostics.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

/// Errors from the persistence sink.
#[derive(Error, Debug)]
pub enum PersistError {
    /// File could not be created or written.
    #[error("capture file I/O: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Record could not be serialized.
    #[error("capture serialization: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Scalar metadata snapshotted at the most recent reference step.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CaptureMeta {
    /// Reference velocity before the step [rpm].
    pub previous_reference_rpm: f64,
    /// Reference velocity after the step [rpm].
    pub reference_rpm: f64,
    /// Proportional gain at the step.
    pub kp: f64,
    /// Integral gain at the step.
    pub ki: f64,
    /// Sample period at the step [s].
    pub period_s: f64,
}

/// One drained capture window plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRecord {
    /// Operator name, from configuration.
    pub operator: String,
    /// Metadata of the step this window captured.
    pub meta: CaptureMeta,
    /// Measured velocity samples [rpm].
    pub measured_rpm: Vec<f64>,
    /// Actuator output samples [V].
    pub output_volts: Vec<f64>,
}

/// Destination for the shutdown capture record.
pub trait CaptureSink: Send {
    /// Persist one record. Called exactly once, at loop shutdown.
    fn persist(&mut self, record: &CaptureRecord) -> Result<(), PersistError>;
}

/// Writes the record as pretty-printed JSON to a file.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptureSink for JsonFileSink {
    fn persist(&mut self, record: &CaptureRecord) -> Result<(), PersistError> {
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), record)?;
        Ok(())
    }
}

/// Retains persisted records in memory behind a shared handle.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<CaptureRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records persisted so far.
    pub fn records(&self) -> Vec<CaptureRecord> {
        self.records.lock().expect("sink lock poisoned").clone()
    }
}

impl CaptureSink for MemorySink {
    fn persist(&mut self, record: &CaptureRecord) -> Result<(), PersistError> {
        self.records
            .lock()
            .expect("sink lock poisoned")
            .push(record.clone());
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
