use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source used by the scheduler for pacing.
///
/// `elapsed` is monotonic time since the clock was created. Implementations must be cheap to call
/// once per tick.
pub trait Clock: Send + Sync {
    /// Monotonic time since the clock's origin.
    fn elapsed(&self) -> Duration;
    /// Block (or advance virtual time) for `d`.
    fn sleep(&self, d: Duration);
    /// Give other work a chance to run when no pacing wait is due.
    fn yield_now(&self) {}
}

/// Wall clock backed by [`Instant`] and `std::thread::sleep`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }
}

/// Virtual clock: `sleep` advances time instantly.
///
/// Used for offline (as fast as possible) exports and for tests that need to observe pacing.
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a virtual clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance virtual time by `d`.
    pub fn advance(&self, d: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += d;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
