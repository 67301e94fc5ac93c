//! Simulated motor rig: an encoder and a DAC backed by one shared model.
//!
//! The model is deliberately simple — each encoder read advances the
//! counter by `counts_per_volt_read · volts`, so a positive drive voltage
//! produces forward counts on the very next tick. It is a test fixture
//! for the loop plumbing, not a plant model.

use std::sync::{Arc, Mutex};

use crate::error::LoopResult;
use crate::hal::{AnalogOutput, Encoder};

#[derive(Debug)]
struct SimState {
    counter: u32,
    volts: f64,
    /// Sub-count remainder carried between reads.
    residual: f64,
    counts_per_volt_read: f64,
    writes: u64,
}

/// Shared simulation model. Hand out [`MotorSim::encoder`] and
/// [`MotorSim::dac`] handles to the loop; keep the rig to inspect it.
#[derive(Debug, Clone)]
pub struct MotorSim {
    state: Arc<Mutex<SimState>>,
}

impl MotorSim {
    /// Create a rig whose counter advances by `counts_per_volt_read`
    /// counts per encoder read per volt of drive.
    pub fn new(counts_per_volt_read: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                counter: 0,
                volts: 0.0,
                residual: 0.0,
                counts_per_volt_read,
                writes: 0,
            })),
        }
    }

    /// Encoder handle for the loop.
    pub fn encoder(&self) -> SimEncoder {
        SimEncoder {
            state: Arc::clone(&self.state),
        }
    }

    /// DAC handle for the loop.
    pub fn dac(&self) -> SimDac {
        SimDac {
            state: Arc::clone(&self.state),
        }
    }

    /// Most recently written drive voltage.
    pub fn last_volts(&self) -> f64 {
        self.state.lock().expect("sim lock poisoned").volts
    }

    /// Number of DAC writes performed.
    pub fn write_count(&self) -> u64 {
        self.state.lock().expect("sim lock poisoned").writes
    }

    /// Force the raw counter, e.g. to exercise wraparound.
    pub fn set_counter(&self, counter: u32) {
        self.state.lock().expect("sim lock poisoned").counter = counter;
    }
}

/// Encoder view of the shared model.
#[derive(Debug)]
pub struct SimEncoder {
    state: Arc<Mutex<SimState>>,
}

impl Encoder for SimEncoder {
    fn read_counter(&mut self) -> LoopResult<u32> {
        let mut s = self.state.lock().expect("sim lock poisoned");
        let advance = s.volts * s.counts_per_volt_read + s.residual;
        let whole = advance.trunc();
        s.residual = advance - whole;
        s.counter = s.counter.wrapping_add(whole as i64 as u32);
        Ok(s.counter)
    }
}

/// DAC view of the shared model.
#[derive(Debug)]
pub struct SimDac {
    state: Arc<Mutex<SimState>>,
}

impl AnalogOutput for SimDac {
    fn write(&mut self, volts: f64) -> LoopResult<()> {
        let mut s = self.state.lock().expect("sim lock poisoned");
        s.volts = volts;
        s.writes += 1;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_rig_holds_still() {
        let rig = MotorSim::new(100.0);
        let mut enc = rig.encoder();
        assert_eq!(enc.read_counter().unwrap(), 0);
        assert_eq!(enc.read_counter().unwrap(), 0);
    }

    #[test]
    fn drive_voltage_advances_counter() {
        let rig = MotorSim::new(100.0);
        let mut enc = rig.encoder();
        let mut dac = rig.dac();
        dac.write(2.0).unwrap();
        assert_eq!(enc.read_counter().unwrap(), 200);
        assert_eq!(enc.read_counter().unwrap(), 400);
        assert_eq!(rig.last_volts(), 2.0);
        assert_eq!(rig.write_count(), 1);
    }

    #[test]
    fn negative_drive_reverses() {
        let rig = MotorSim::new(100.0);
        let mut enc = rig.encoder();
        let mut dac = rig.dac();
        enc.read_counter().unwrap();
        dac.write(-1.0).unwrap();
        let c = enc.read_counter().unwrap();
        // Reverse rotation wraps below zero on the raw counter.
        assert_eq!(c, 0u32.wrapping_sub(100));
    }

    #[test]
    fn counter_wraps_at_32_bits() {
        let rig = MotorSim::new(100.0);
        rig.set_counter(u32::MAX - 50);
        let mut enc = rig.encoder();
        let mut dac = rig.dac();
        dac.write(1.0).unwrap();
        assert_eq!(enc.read_counter().unwrap(), 49);
    }

    #[test]
    fn fractional_counts_accumulate() {
        let rig = MotorSim::new(0.4);
        let mut enc = rig.encoder();
        let mut dac = rig.dac();
        dac.write(1.0).unwrap();
        // 0.4 per read: whole counts land on reads 3, 5, 8, 10, ...
        let counts: Vec<u32> = (0..5).map(|_| enc.read_counter().unwrap()).collect();
        assert_eq!(counts, vec![0, 0, 1, 1, 2]);
    }
}
