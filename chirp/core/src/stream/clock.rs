//! Time source for the reconnect loop
//!
//! The supervisor never calls `Instant::now()` or `thread::sleep` directly.
//! It asks a [`Clock`], so tests can drive the rolling window with a
//! [`ManualClock`] instead of waiting a real minute.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Flag that wakes a parked supervisor thread
///
/// Once raised it stays raised.
#[derive(Default)]
pub struct ShutdownSignal {
    raised: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownSignal {
    /// A signal that has not been raised
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every thread parked on it
    pub fn raise(&self) {
        *self.raised.lock() = true;
        self.wake.notify_all();
    }

    /// Whether [`ShutdownSignal::raise`] has been called
    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self.raised.lock()
    }

    /// Block until the signal is raised
    pub fn wait(&self) {
        let mut raised = self.raised.lock();
        while !*raised {
            self.wake.wait(&mut raised);
        }
    }

    /// Block for up to `timeout`; `true` if the signal was raised
    ///
    /// A timeout too large to express as an [`Instant`] waits for the signal
    /// alone.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut raised = self.raised.lock();
        while !*raised {
            if self.wake.wait_until(&mut raised, deadline).timed_out() {
                break;
            }
        }
        *raised
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("raised", &self.is_raised())
            .finish()
    }
}

/// Monotonic time plus an interruptible sleep
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Sleep for `duration` or until `signal` is raised
    ///
    /// Returns `true` when the sleep ended because of the signal.
    fn park(&self, signal: &ShutdownSignal, duration: Duration) -> bool;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn park(&self, signal: &ShutdownSignal, duration: Duration) -> bool {
        signal.wait_timeout(duration)
    }
}

// =============================================================================
// Manual Clock
// =============================================================================

/// Simulated clock that only moves when told to
///
/// Parked threads wake up when [`ManualClock::advance`] carries the clock past
/// their deadline, or when their signal is raised.
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
    tick: Condvar,
}

#[derive(Default)]
struct ManualState {
    elapsed: Duration,
    parked: usize,
}

/// How often a parked thread re-checks its shutdown signal
const SIGNAL_POLL: Duration = Duration::from_millis(5);

impl ManualClock {
    /// A clock frozen at the current instant
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
            tick: Condvar::new(),
        }
    }

    /// Move simulated time forward and wake parked threads
    pub fn advance(&self, by: Duration) {
        self.state.lock().elapsed += by;
        self.tick.notify_all();
    }

    /// Simulated time since creation
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Number of threads currently inside [`Clock::park`]
    #[must_use]
    pub fn parked(&self) -> usize {
        self.state.lock().parked
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn park(&self, signal: &ShutdownSignal, duration: Duration) -> bool {
        let mut state = self.state.lock();
        let deadline = state.elapsed.saturating_add(duration);
        state.parked += 1;

        let interrupted = loop {
            if signal.is_raised() {
                break true;
            }
            if state.elapsed >= deadline {
                break false;
            }
            self.tick.wait_for(&mut state, SIGNAL_POLL);
        };

        state.parked -= 1;
        interrupted
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualClock")
            .field("elapsed", &state.elapsed)
            .field("parked", &state.parked)
            .finish()
    }
}
