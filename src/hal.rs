//! Hardware seams for the control loop.
//!
//! The loop owns three handles: a periodic timer event source, a
//! quadrature encoder counter, and an analog output channel. Each is a
//! trait so tests and the bundled simulation rig can stand in for real
//! hardware. Registration failures are constructor failures
//! ([`SoftTimer::register`]); unregistration is `Drop`.
//!
//! Cancellation crosses the thread boundary through [`CancelToken`]: an
//! atomic flag plus a condvar, so a blocked timer wait wakes immediately
//! on cancel instead of running out its timeout.

pub mod sim;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{LoopError, LoopResult};

// ─── Cancellation Token ─────────────────────────────────────────────

/// Shared cooperative cancellation flag.
///
/// Cloning yields another handle to the same flag. `cancel()` is
/// idempotent and wakes any thread blocked in [`CancelToken::wait_until`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake all blocked waiters.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock.lock().expect("cancel lock poisoned");
        self.inner.cvar.notify_all();
    }

    /// Whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Block until `deadline` or until cancelled, whichever comes first.
    /// Returns true if cancellation was observed.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = self.inner.lock.lock().expect("cancel lock poisoned");
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now) else {
                return self.is_cancelled();
            };
            let (next, timeout) = self
                .inner
                .cvar
                .wait_timeout(guard, remaining)
                .expect("cancel lock poisoned");
            guard = next;
            if timeout.timed_out() {
                return self.is_cancelled();
            }
        }
    }
}

// ─── Timer Event Source ─────────────────────────────────────────────

/// Bit asserted in the wait mask when the periodic timer fired.
pub const TIMER_ASSERT: u32 = 1 << 0;

/// Outcome of one blocking wait on the timer event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The timer fired; mask of asserted event bits.
    Asserted(u32),
    /// Cancellation was observed while blocked.
    Cancelled,
}

/// Periodic wake-up source with a reprogrammable interval.
///
/// One wait per tick; `reschedule` affects the *next* wake, not the one
/// currently pending. `acknowledge` re-arms the event after servicing.
pub trait TimerIrq: Send {
    /// Block until the next timer event or cancellation.
    fn wait(&mut self, cancel: &CancelToken) -> LoopResult<WaitOutcome>;

    /// Reprogram the interval for subsequent wakes [µs].
    fn reschedule(&mut self, period_us: u32) -> LoopResult<()>;

    /// Acknowledge a serviced event mask.
    fn acknowledge(&mut self, asserted: u32) -> LoopResult<()>;
}

/// Quadrature encoder counter: monotonic, wraps at 32 bits.
pub trait Encoder: Send {
    fn read_counter(&mut self) -> LoopResult<u32>;
}

/// Analog output channel [V].
pub trait AnalogOutput: Send {
    fn write(&mut self, volts: f64) -> LoopResult<()>;
}

// ─── Monotonic Software Timer ───────────────────────────────────────

/// Monotonic-clock periodic timer.
///
/// Paces on absolute deadlines (`anchor + period`) so servicing jitter
/// does not accumulate as drift. The deadline for the next wake is
/// computed at wait entry, which is what makes a mid-tick `reschedule`
/// take effect on the next wake.
#[derive(Debug)]
pub struct SoftTimer {
    period: Duration,
    anchor: Instant,
}

impl SoftTimer {
    /// Register a periodic timer with the given interval [µs].
    ///
    /// Fails with [`LoopError::Register`] on a zero interval.
    pub fn register(period_us: u32) -> LoopResult<Self> {
        if period_us == 0 {
            return Err(LoopError::Register("zero timer interval".to_string()));
        }
        Ok(Self {
            period: Duration::from_micros(u64::from(period_us)),
            anchor: Instant::now(),
        })
    }
}

impl TimerIrq for SoftTimer {
    fn wait(&mut self, cancel: &CancelToken) -> LoopResult<WaitOutcome> {
        let deadline = self.anchor + self.period;
        if cancel.wait_until(deadline) {
            return Ok(WaitOutcome::Cancelled);
        }
        self.anchor = deadline;
        Ok(WaitOutcome::Asserted(TIMER_ASSERT))
    }

    fn reschedule(&mut self, period_us: u32) -> LoopResult<()> {
        if period_us == 0 {
            return Err(LoopError::Io("zero timer interval".to_string()));
        }
        self.period = Duration::from_micros(u64::from(period_us));
        Ok(())
    }

    fn acknowledge(&mut self, _asserted: u32) -> LoopResult<()> {
        // The software timer has no latch to clear.
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn token_starts_clear_and_cancels() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Idempotent.
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn wait_until_runs_out_the_clock() {
        let token = CancelToken::new();
        let start = Instant::now();
        let cancelled = token.wait_until(start + Duration::from_millis(20));
        assert!(!cancelled);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_a_blocked_wait() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = token.wait_until(start + Duration::from_secs(10));
                (cancelled, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(10));
        token.cancel();
        let (cancelled, elapsed) = waiter.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(1), "wait did not wake early");
    }

    #[test]
    fn timer_rejects_zero_interval() {
        assert!(matches!(
            SoftTimer::register(0),
            Err(LoopError::Register(_))
        ));
    }

    #[test]
    fn timer_fires_and_observes_cancel() {
        let mut timer = SoftTimer::register(1_000).unwrap();
        let token = CancelToken::new();
        match timer.wait(&token).unwrap() {
            WaitOutcome::Asserted(mask) => assert_ne!(mask & TIMER_ASSERT, 0),
            WaitOutcome::Cancelled => panic!("uncancelled wait must assert"),
        }
        token.cancel();
        assert_eq!(timer.wait(&token).unwrap(), WaitOutcome::Cancelled);
    }

    #[test]
    fn reschedule_applies_to_next_wake() {
        let mut timer = SoftTimer::register(1_000).unwrap();
        let token = CancelToken::new();
        timer.wait(&token).unwrap();

        // Stretch the interval mid-tick; the next wait must honor it.
        timer.reschedule(30_000).unwrap();
        let start = Instant::now();
        timer.wait(&token).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
