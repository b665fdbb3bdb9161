//! Monotonic time sources for the pacing loop.
//!
//! The loop never reads wall time directly. It goes through [`Clock`] so the
//! same code can run against the OS clock in production and against a
//! [`ManualClock`] in tests, where "slow" ticks are simulated by advancing
//! time instead of sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A monotonic clock the pacing loop can read and sleep on.
pub trait Clock: Send + Sync {
    /// Time since an arbitrary fixed epoch
    fn now(&self) -> Duration;

    /// Blocks the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Production clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Creates a clock whose epoch is the moment of construction
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Deterministic clock for tests.
///
/// Clones share the same time. `sleep` advances time instantly, and test
/// collaborators call [`ManualClock::advance`] to simulate work that takes
/// a given number of milliseconds.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward
    pub fn advance(&self, duration: Duration) {
        self.micros
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    /// Moves time forward by whole milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Restartable elapsed-time measurement over a [`Clock`].
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: Duration,
}

impl Stopwatch {
    /// Starts measuring from the clock's current time
    pub fn start(clock: &dyn Clock) -> Self {
        Self {
            started_at: clock.now(),
        }
    }

    /// Resets the start point to now
    pub fn restart(&mut self, clock: &dyn Clock) {
        self.started_at = clock.now();
    }

    /// Time since the last (re)start
    pub fn elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.now().saturating_sub(self.started_at)
    }

    /// Whole milliseconds since the last (re)start
    pub fn elapsed_ms(&self, clock: &dyn Clock) -> u64 {
        self.elapsed(clock).as_millis() as u64
    }
}
