//! Control loop orchestrator: the dedicated real-time thread.
//!
//! Each tick, in order: reschedule the timer from the table's live period,
//! sample the encoder and publish measured rpm, rewrite the PI stage's
//! coefficients, compute the velocity error in rad/s, evaluate the
//! cascade with saturation, drive the DAC, publish the output, append to
//! the step capture (restarting it on a reference change), acknowledge
//! the timer. Between wake and the next wait the tick is fully
//! synchronous and must finish inside the current period.
//!
//! The thread blocks at exactly one point — the timer wait — and that
//! wait observes the cancellation token, so shutdown latency is bounded
//! by one period. On exit: zero the DAC, drain the capture, hand the
//! record to the sink exactly once.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::capture::StepCapture;
use crate::config::LoopConfig;
use crate::control::biquad::FilterCascade;
use crate::control::pi;
use crate::error::{LoopError, LoopResult};
use crate::hal::{AnalogOutput, CancelToken, Encoder, TimerIrq, WaitOutcome, TIMER_ASSERT};
use crate::params::{Param, ParameterTable};
use crate::persist::{CaptureMeta, CaptureRecord, CaptureSink};
use crate::velocity::{delta_to_rpm, VelocityEstimator};

use std::sync::Arc;

/// rad/s per rpm.
const RAD_S_PER_RPM: f64 = 2.0 * std::f64::consts::PI / 60.0;

/// Index of the PI section in the cascade.
const PI_STAGE: usize = 0;

/// SCHED_FIFO priority for the loop thread (rt feature only).
#[cfg(feature = "rt")]
const RT_PRIORITY: i32 = 80;

// ─── Tick Statistics ────────────────────────────────────────────────

/// O(1) per-tick timing statistics, updated with no allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    /// Ticks executed.
    pub tick_count: u64,
    /// Last tick duration [ns].
    pub last_tick_ns: u64,
    /// Maximum tick duration [ns].
    pub max_tick_ns: u64,
    /// Ticks that exceeded the period in force at the time.
    pub overruns: u64,
}

impl TickStats {
    #[inline]
    fn record(&mut self, duration_ns: u64, budget_ns: u64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        if duration_ns > self.max_tick_ns {
            self.max_tick_ns = duration_ns;
        }
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock pages and switch the current thread to SCHED_FIFO.
///
/// No-op without the `rt` feature (simulation / tests).
#[cfg(feature = "rt")]
fn rt_setup() -> LoopResult<()> {
    use nix::sys::mman::{mlockall, MlockallFlags};

    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| LoopError::Session(format!("mlockall failed: {e}")))?;

    let param = libc::sched_param {
        sched_priority: RT_PRIORITY,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(LoopError::Session(format!(
            "sched_setscheduler(SCHED_FIFO, {RT_PRIORITY}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_setup() -> LoopResult<()> {
    Ok(())
}

// ─── Control Loop ───────────────────────────────────────────────────

/// All state owned by the control thread.
///
/// Constructed once per loop run and consumed by [`ControlLoop::spawn`];
/// nothing here is shared except the parameter table and the token.
pub struct ControlLoop<T, E, D>
where
    T: TimerIrq + 'static,
    E: Encoder + 'static,
    D: AnalogOutput + 'static,
{
    timer: T,
    encoder: E,
    dac: D,
    table: Arc<ParameterTable>,
    sink: Box<dyn CaptureSink>,

    cascade: FilterCascade,
    estimator: VelocityEstimator,
    capture: StepCapture,
    stats: TickStats,

    prev_reference: f64,
    meta: CaptureMeta,
    operator: String,
    counts_per_rev: f64,
    v_min: f64,
    v_max: f64,
}

impl<T, E, D> ControlLoop<T, E, D>
where
    T: TimerIrq + 'static,
    E: Encoder + 'static,
    D: AnalogOutput + 'static,
{
    /// Assemble a loop from a validated configuration and its hardware
    /// handles. Fails on precondition violations; never re-checks them
    /// on the hot path.
    pub fn new(
        config: &LoopConfig,
        table: Arc<ParameterTable>,
        timer: T,
        encoder: E,
        dac: D,
        sink: Box<dyn CaptureSink>,
    ) -> LoopResult<Self> {
        config.validate()?;

        let cascade = FilterCascade::from_stages(&[pi::pi_stage()])
            .expect("single PI stage fits the cascade");

        Ok(Self {
            timer,
            encoder,
            dac,
            table,
            sink,
            cascade,
            estimator: VelocityEstimator::new(),
            capture: StepCapture::new(),
            stats: TickStats::default(),
            prev_reference: config.reference_rpm,
            meta: CaptureMeta {
                previous_reference_rpm: config.reference_rpm,
                reference_rpm: config.reference_rpm,
                kp: config.kp,
                ki: config.ki,
                period_s: config.period_s(),
            },
            operator: config.operator.clone(),
            counts_per_rev: config.counts_per_rev,
            v_min: config.v_min,
            v_max: config.v_max,
        })
    }

    /// Start the dedicated control thread.
    ///
    /// The owner keeps the returned handle; `cancel` + `join` is the only
    /// shutdown path.
    pub fn spawn(self, cancel: CancelToken) -> LoopResult<LoopHandle> {
        let token = cancel.clone();
        let thread = thread::Builder::new()
            .name("control-loop".to_string())
            .spawn(move || self.run(&token))
            .map_err(|e| LoopError::Session(format!("failed to spawn loop thread: {e}")))?;
        Ok(LoopHandle { cancel, thread })
    }

    /// Blocking loop body; runs on the control thread until cancelled.
    fn run(mut self, cancel: &CancelToken) -> LoopResult<TickStats> {
        rt_setup()?;
        info!("control loop running");

        loop {
            // A timer fault ends the session, but the exit sequence below
            // still runs: zero the actuator, flush the capture.
            let outcome = match self.timer.wait(cancel) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "timer wait failed, stopping loop");
                    break;
                }
            };
            // Cancellation is checked right at wait-return so shutdown
            // latency stays within one period.
            if cancel.is_cancelled() {
                break;
            }
            let WaitOutcome::Asserted(mask) = outcome else {
                break;
            };
            if mask & TIMER_ASSERT == 0 {
                continue;
            }

            let budget_ns = (self.table.get(Param::PeriodMs) * 1e6) as u64;
            let tick_start = Instant::now();
            self.tick();
            self.stats
                .record(tick_start.elapsed().as_nanos() as u64, budget_ns);

            if let Err(e) = self.timer.acknowledge(mask) {
                warn!(error = %e, "timer acknowledge failed");
            }
        }

        self.shutdown()
    }

    /// One full control tick. I/O failures are logged and the affected
    /// sub-step skipped; a running control system is not aborted for a
    /// single bad sample.
    fn tick(&mut self) {
        let period_ms = self.table.get(Param::PeriodMs);
        let period_s = period_ms / 1e3;

        // 1. Reschedule first: the *next* wake reflects the latest period.
        if let Err(e) = self.timer.reschedule((period_ms * 1e3) as u32) {
            warn!(error = %e, "timer reschedule skipped");
        }

        // 2. Sample the encoder, publish measured velocity.
        match self.encoder.read_counter() {
            Ok(counter) => {
                let delta = self.estimator.sample(counter);
                let rpm = delta_to_rpm(delta, self.counts_per_rev, period_s);
                self.table.set(Param::Measured, rpm);
            }
            Err(e) => warn!(error = %e, "encoder read failed, velocity update skipped"),
        }

        let reference = self.table.get(Param::Reference);
        let measured = self.table.get(Param::Measured);
        let kp = self.table.get(Param::Kp);
        let ki = self.table.get(Param::Ki);

        // 3. Live PI law: rewrite coefficients, keep histories.
        pi::update_pi_stage(self.cascade.stage_mut(PI_STAGE), kp, ki, period_s);

        // 4. Velocity error in rad/s.
        let error = (reference - measured) * RAD_S_PER_RPM;

        // 5. Evaluate and saturate.
        let volts = self.cascade.evaluate(error, self.v_min, self.v_max);

        // 6. Drive the actuator, publish the output in mV. An unapplied
        //    voltage is never published: the display entry and the capture
        //    only ever hold what was actually driven.
        match self.dac.write(volts) {
            Ok(()) => {
                self.table.set(Param::OutputMv, volts * 1e3);
                // 7. Log the pair.
                self.capture.append(measured, volts);
            }
            Err(e) => warn!(error = %e, "actuator write failed, output not published"),
        }

        // A reference step begins a fresh capture window.
        if reference != self.prev_reference {
            debug!(
                from = self.prev_reference,
                to = reference,
                "reference step, restarting capture"
            );
            self.capture.restart();
            self.meta = CaptureMeta {
                previous_reference_rpm: self.prev_reference,
                reference_rpm: reference,
                kp,
                ki,
                period_s,
            };
            self.prev_reference = reference;
        }
    }

    /// Normal termination: zero the actuator, flush the capture, hand the
    /// record to the sink — in that order.
    fn shutdown(mut self) -> LoopResult<TickStats> {
        if let Err(e) = self.dac.write(0.0) {
            warn!(error = %e, "failed to zero actuator at shutdown");
        }

        let (measured, output) = self.capture.drain();
        let record = CaptureRecord {
            operator: self.operator.clone(),
            meta: self.meta,
            measured_rpm: measured.to_vec(),
            output_volts: output.to_vec(),
        };
        self.sink.persist(&record)?;

        info!(
            ticks = self.stats.tick_count,
            max_tick_ns = self.stats.max_tick_ns,
            overruns = self.stats.overruns,
            samples = record.measured_rpm.len(),
            "control loop stopped"
        );
        Ok(self.stats)
    }
}

// ─── Loop Handle ────────────────────────────────────────────────────

/// Owner-side handle: cancel the token, then join.
pub struct LoopHandle {
    cancel: CancelToken,
    thread: JoinHandle<LoopResult<TickStats>>,
}

impl LoopHandle {
    /// Request cooperative cancellation; the thread observes it at the
    /// next wait-return.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the loop thread terminates.
    pub fn join(self) -> LoopResult<TickStats> {
        self.thread
            .join()
            .map_err(|_| LoopError::Session("control loop thread panicked".to_string()))?
    }

    /// Cancel and join in one call.
    pub fn stop(self) -> LoopResult<TickStats> {
        self.cancel();
        self.join()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
