//! Shared parameter table: named, typed, concurrently accessed tunables.
//!
//! The schema — entry order, labels, editable flags — is fixed at
//! construction and never changes. Values are `f64` stored as bit patterns
//! in per-entry `AtomicU64`s, so a `get`/`set` pair can never observe a
//! torn value and the real-time thread never blocks on the editor thread.
//!
//! Writer discipline (convention, not enforced by the table): the control
//! thread is the sole writer of display entries; the editor thread is the
//! sole writer of editable entries; both may read anything.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of entries in the velocity-control schema.
pub const PARAM_COUNT: usize = 6;

/// Index into the velocity-control parameter schema (fixed order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Param {
    /// Reference velocity [rpm] — editable.
    Reference = 0,
    /// Measured velocity [rpm] — display.
    Measured = 1,
    /// Actuator output [mV] — display.
    OutputMv = 2,
    /// Proportional gain [V·s/rad] — editable.
    Kp = 3,
    /// Integral gain [V/rad] — editable.
    Ki = 4,
    /// Sample period BTI [ms] — editable.
    PeriodMs = 5,
}

/// All parameters in schema order, for editor/diagnostic iteration.
pub const PARAMS: [Param; PARAM_COUNT] = [
    Param::Reference,
    Param::Measured,
    Param::OutputMv,
    Param::Kp,
    Param::Ki,
    Param::PeriodMs,
];

/// One table entry: immutable label/flag, atomically mutable value.
struct ParameterEntry {
    label: &'static str,
    editable: bool,
    bits: AtomicU64,
}

impl ParameterEntry {
    fn new(label: &'static str, editable: bool, initial: f64) -> Self {
        Self {
            label,
            editable,
            bits: AtomicU64::new(initial.to_bits()),
        }
    }
}

/// Fixed-schema parameter table shared between the control thread and the
/// editor thread.
pub struct ParameterTable {
    entries: [ParameterEntry; PARAM_COUNT],
}

/// Initial values for the editable entries.
#[derive(Debug, Clone, Copy)]
pub struct TableDefaults {
    pub reference_rpm: f64,
    pub kp: f64,
    pub ki: f64,
    pub period_ms: f64,
}

impl ParameterTable {
    /// Build the velocity-control schema with the given initial tunables.
    /// Display entries start at zero.
    pub fn new(defaults: TableDefaults) -> Self {
        Self {
            entries: [
                ParameterEntry::new("V_ref: rpm", true, defaults.reference_rpm),
                ParameterEntry::new("V_meas: rpm", false, 0.0),
                ParameterEntry::new("VDA out: mV", false, 0.0),
                ParameterEntry::new("Kp: V-s/rad", true, defaults.kp),
                ParameterEntry::new("Ki: V/rad", true, defaults.ki),
                ParameterEntry::new("BTI: ms", true, defaults.period_ms),
            ],
        }
    }

    /// Atomically read one entry's value.
    #[inline]
    pub fn get(&self, param: Param) -> f64 {
        // Relaxed: each entry is an independent scalar; no cross-entry
        // ordering is required by the tick algorithm.
        f64::from_bits(self.entries[param as usize].bits.load(Ordering::Relaxed))
    }

    /// Atomically write one entry's value.
    #[inline]
    pub fn set(&self, param: Param, value: f64) {
        self.entries[param as usize]
            .bits
            .store(value.to_bits(), Ordering::Relaxed);
    }

    /// Entry label, for editor/diagnostic rendering.
    pub fn label(&self, param: Param) -> &'static str {
        self.entries[param as usize].label
    }

    /// Whether the editor thread may write this entry.
    pub fn is_editable(&self, param: Param) -> bool {
        self.entries[param as usize].editable
    }
}

impl std::fmt::Debug for ParameterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("ParameterTable");
        for p in PARAMS {
            dbg.field(self.label(p), &self.get(p));
        }
        dbg.finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn defaults() -> TableDefaults {
        TableDefaults {
            reference_rpm: 0.0,
            kp: 0.104,
            ki: 2.07,
            period_ms: 5.0,
        }
    }

    #[test]
    fn schema_order_and_flags() {
        let t = ParameterTable::new(defaults());
        assert!(t.is_editable(Param::Reference));
        assert!(!t.is_editable(Param::Measured));
        assert!(!t.is_editable(Param::OutputMv));
        assert!(t.is_editable(Param::Kp));
        assert!(t.is_editable(Param::Ki));
        assert!(t.is_editable(Param::PeriodMs));
        assert_eq!(PARAMS[0] as usize, 0);
        assert_eq!(PARAMS[5] as usize, 5);
    }

    #[test]
    fn initial_values() {
        let t = ParameterTable::new(defaults());
        assert_eq!(t.get(Param::Kp), 0.104);
        assert_eq!(t.get(Param::Ki), 2.07);
        assert_eq!(t.get(Param::PeriodMs), 5.0);
        assert_eq!(t.get(Param::Measured), 0.0);
    }

    #[test]
    fn set_then_get_roundtrips_exact_bits() {
        let t = ParameterTable::new(defaults());
        for v in [0.0, -0.0, 1.5, f64::MIN_POSITIVE, 1e300, -273.15] {
            t.set(Param::Reference, v);
            assert_eq!(t.get(Param::Reference).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn concurrent_access_never_tears() {
        // Writer flips between two distant values; reader must only ever
        // observe one of them.
        let t = Arc::new(ParameterTable::new(defaults()));
        let writer = {
            let t = Arc::clone(&t);
            std::thread::spawn(move || {
                for i in 0..100_000u32 {
                    let v = if i % 2 == 0 { 1.0 } else { -1e308 };
                    t.set(Param::Reference, v);
                }
            })
        };
        let reader = {
            let t = Arc::clone(&t);
            std::thread::spawn(move || {
                for _ in 0..100_000 {
                    let v = t.get(Param::Reference);
                    assert!(
                        v == 0.0 || v == 1.0 || v == -1e308,
                        "torn read observed: {v}"
                    );
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }
}
