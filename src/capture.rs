//! Bounded dual-channel sample logger for step-response windows.
//!
//! Two parallel fixed-capacity sequences (measured velocity and actuator
//! output) fill in lockstep. Appending past capacity is a silent no-op —
//! the capture window is full, not broken. `restart()` discards the
//! unflushed tail and begins a fresh window; the orchestrator calls it on
//! every reference step so each drained capture is one step response.

/// Samples retained per capture window (per channel).
pub const CAPTURE_CAPACITY: usize = 250;

/// Fixed-capacity (measured, output) sample buffer.
#[derive(Debug, Default)]
pub struct StepCapture {
    measured: heapless::Vec<f64, CAPTURE_CAPACITY>,
    output: heapless::Vec<f64, CAPTURE_CAPACITY>,
}

impl StepCapture {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one (measured, output) pair, or do nothing if full.
    #[inline]
    pub fn append(&mut self, measured: f64, output: f64) {
        if self.measured.is_full() {
            return;
        }
        // Both pushes succeed: the vectors fill in lockstep.
        let _ = self.measured.push(measured);
        let _ = self.output.push(output);
    }

    /// Discard everything and begin a fresh window.
    #[inline]
    pub fn restart(&mut self) {
        self.measured.clear();
        self.output.clear();
    }

    /// Number of logged pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.measured.len()
    }

    /// True when no pairs are logged.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
    }

    /// True when the window has stopped accepting data.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.measured.is_full()
    }

    /// Logged pairs up to the current cursor, for sink handoff.
    pub fn drain(&self) -> (&[f64], &[f64]) {
        (&self.measured, &self.output)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_drain() {
        let mut cap = StepCapture::new();
        cap.append(10.0, 0.5);
        cap.append(20.0, 1.0);
        let (m, o) = cap.drain();
        assert_eq!(m, &[10.0, 20.0]);
        assert_eq!(o, &[0.5, 1.0]);
    }

    #[test]
    fn append_past_capacity_is_noop() {
        let mut cap = StepCapture::new();
        for i in 0..(CAPTURE_CAPACITY + 50) {
            cap.append(i as f64, -(i as f64));
        }
        assert_eq!(cap.len(), CAPTURE_CAPACITY);
        assert!(cap.is_full());
        let (m, o) = cap.drain();
        // The overflow samples were dropped, not wrapped.
        assert_eq!(m[CAPTURE_CAPACITY - 1], (CAPTURE_CAPACITY - 1) as f64);
        assert_eq!(o[CAPTURE_CAPACITY - 1], -((CAPTURE_CAPACITY - 1) as f64));
    }

    #[test]
    fn restart_resets_cursor() {
        let mut cap = StepCapture::new();
        for i in 0..100 {
            cap.append(i as f64, 0.0);
        }
        cap.restart();
        assert!(cap.is_empty());
        cap.append(7.0, 8.0);
        let (m, o) = cap.drain();
        assert_eq!(m, &[7.0]);
        assert_eq!(o, &[8.0]);
    }

    #[test]
    fn channels_stay_in_lockstep() {
        let mut cap = StepCapture::new();
        for i in 0..(CAPTURE_CAPACITY * 2) {
            cap.append(i as f64, i as f64 * 2.0);
            let (m, o) = cap.drain();
            assert_eq!(m.len(), o.len());
        }
    }
}
