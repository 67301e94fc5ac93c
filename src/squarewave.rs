//! Square-wave drive: the finite-state-machine variant of the tick
//! discipline.
//!
//! A degenerate case of the control loop: the same periodic tick, but the
//! body is a state machine toggling a digital line — high for M ticks out
//! of every N-tick wave period — with two buttons requesting a velocity
//! readout or a stop. Dispatch is an exhaustive match over
//! [`SquareWaveState`], so every transition is statically checked.

use crate::error::LoopResult;
use crate::velocity::{delta_to_rpm, VelocityEstimator};

/// Digital output line driving the amplifier's run input.
pub trait DigitalOutput: Send {
    fn write(&mut self, high: bool) -> LoopResult<()>;
}

/// FSM states. `Exit` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareWaveState {
    /// Line low, waiting out the off-portion of the period.
    Low,
    /// Line high, waiting out the on-portion.
    High,
    /// One-shot velocity readout, then back to High.
    Speed,
    /// Drive dropped; next tick exits.
    Stop,
    /// Terminal.
    Exit,
}

/// Button inputs sampled once per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchInputs {
    /// Stop switch pressed.
    pub stop: bool,
    /// Velocity-readout switch pressed.
    pub print: bool,
}

/// Result of a readout tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEffect {
    /// Nothing to report.
    None,
    /// Velocity readout produced [rpm].
    Speed(f64),
}

/// Square-wave drive state machine.
#[derive(Debug)]
pub struct SquareWaveFsm {
    state: SquareWaveState,
    clock_count: u32,
    /// Full wave period [ticks].
    n_period: u32,
    /// On-portion [ticks], < `n_period`.
    m_on: u32,
    estimator: VelocityEstimator,
    counts_per_rev: f64,
    tick_s: f64,
}

impl SquareWaveFsm {
    /// `n_period` is the full wave period in ticks, `m_on` the high
    /// portion; `tick_s` is the tick period in seconds.
    pub fn new(n_period: u32, m_on: u32, counts_per_rev: f64, tick_s: f64) -> Self {
        Self {
            state: SquareWaveState::Low,
            clock_count: 0,
            n_period,
            m_on,
            estimator: VelocityEstimator::new(),
            counts_per_rev,
            tick_s,
        }
    }

    /// Current state.
    pub fn state(&self) -> SquareWaveState {
        self.state
    }

    /// True once the machine has reached `Exit`.
    pub fn finished(&self) -> bool {
        self.state == SquareWaveState::Exit
    }

    /// Advance one tick: sample inputs, maybe toggle the line, maybe
    /// produce a velocity readout.
    pub fn step(
        &mut self,
        inputs: SwitchInputs,
        counter: u32,
        out: &mut impl DigitalOutput,
    ) -> LoopResult<TickEffect> {
        use SquareWaveState::*;

        self.clock_count += 1;
        let mut effect = TickEffect::None;

        self.state = match self.state {
            Low => {
                if self.clock_count >= self.n_period {
                    self.clock_count = 0;
                    out.write(true)?;
                    if inputs.stop {
                        out.write(false)?;
                        Stop
                    } else if inputs.print {
                        Speed
                    } else {
                        High
                    }
                } else {
                    Low
                }
            }
            High => {
                if self.clock_count >= self.m_on {
                    out.write(false)?;
                    Low
                } else {
                    High
                }
            }
            Speed => {
                let delta = self.estimator.sample(counter);
                let window_s = self.tick_s * f64::from(self.n_period);
                effect = TickEffect::Speed(delta_to_rpm(delta, self.counts_per_rev, window_s));
                High
            }
            Stop => {
                out.write(false)?;
                Exit
            }
            Exit => Exit,
        };

        Ok(effect)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingLine {
        level: bool,
        edges: Vec<bool>,
    }

    impl DigitalOutput for RecordingLine {
        fn write(&mut self, high: bool) -> LoopResult<()> {
            self.level = high;
            self.edges.push(high);
            Ok(())
        }
    }

    fn fsm() -> SquareWaveFsm {
        SquareWaveFsm::new(3, 2, 2048.0, 0.005)
    }

    #[test]
    fn idle_inputs_produce_square_wave() {
        let mut m = fsm();
        let mut line = RecordingLine::default();
        for _ in 0..20 {
            m.step(SwitchInputs::default(), 0, &mut line).unwrap();
        }
        // Rising and falling edges must alternate.
        assert!(line.edges.len() >= 4);
        for pair in line.edges.windows(2) {
            assert_ne!(pair[0], pair[1], "edges must alternate: {:?}", line.edges);
        }
    }

    #[test]
    fn stop_switch_drops_line_and_exits() {
        let mut m = fsm();
        let mut line = RecordingLine::default();
        // Walk to the end of the off-portion with stop held.
        let held = SwitchInputs {
            stop: true,
            print: false,
        };
        for _ in 0..3 {
            m.step(held, 0, &mut line).unwrap();
        }
        assert_eq!(m.state(), SquareWaveState::Stop);
        assert!(!line.level, "line must be low after stop");
        m.step(SwitchInputs::default(), 0, &mut line).unwrap();
        assert!(m.finished());
        assert!(!line.level);
        // Exit is terminal.
        m.step(SwitchInputs::default(), 0, &mut line).unwrap();
        assert_eq!(m.state(), SquareWaveState::Exit);
    }

    #[test]
    fn print_switch_yields_one_speed_readout() {
        let mut m = fsm();
        let mut line = RecordingLine::default();
        let pressed = SwitchInputs {
            stop: false,
            print: true,
        };
        // Reach the boundary with print held → Speed state.
        for _ in 0..2 {
            m.step(SwitchInputs::default(), 0, &mut line).unwrap();
        }
        m.step(pressed, 0, &mut line).unwrap();
        assert_eq!(m.state(), SquareWaveState::Speed);

        // The readout tick: first estimator sample is the baseline.
        let effect = m.step(SwitchInputs::default(), 1000, &mut line).unwrap();
        assert_eq!(effect, TickEffect::Speed(0.0));
        assert_eq!(m.state(), SquareWaveState::High);
    }

    #[test]
    fn speed_readout_uses_full_wave_window() {
        let mut m = fsm();
        let mut line = RecordingLine::default();
        // Prime the estimator baseline through one readout.
        for _ in 0..2 {
            m.step(SwitchInputs::default(), 0, &mut line).unwrap();
        }
        m.step(
            SwitchInputs {
                print: true,
                ..Default::default()
            },
            0,
            &mut line,
        )
        .unwrap();
        m.step(SwitchInputs::default(), 0, &mut line).unwrap();

        // Next readout: 2048 counts over a 3-tick (15 ms) wave period =
        // 1 rev / 15 ms = 4000 rpm.
        loop {
            if m.state() == SquareWaveState::Low && m.clock_count == 2 {
                break;
            }
            m.step(SwitchInputs::default(), 0, &mut line).unwrap();
        }
        m.step(
            SwitchInputs {
                print: true,
                ..Default::default()
            },
            0,
            &mut line,
        )
        .unwrap();
        let effect = m.step(SwitchInputs::default(), 2048, &mut line).unwrap();
        match effect {
            TickEffect::Speed(rpm) => assert!((rpm - 4000.0).abs() < 1e-9),
            TickEffect::None => panic!("expected a speed readout"),
        }
    }
}
