use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::clock::Clock;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{FailureReason, ReelError, ReelResult};

/// Lifecycle of one export session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing started yet.
    Idle,
    /// Waiting for required assets and starting the sink.
    Priming,
    /// Producing ticks.
    Running,
    /// Finalizing the sink and releasing resources.
    Draining,
    /// Finished with an output.
    Complete,
    /// Finished with a fatal error.
    Failed(FailureReason),
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed(_))
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Priming)
                | (Self::Priming, Self::Running)
                | (Self::Priming | Self::Running, Self::Draining)
                | (Self::Draining, Self::Complete | Self::Failed(_))
        )
    }
}

/// Cooperative cancellation flag. Clones share the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed at the next tick boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Work performed once per tick.
pub(crate) trait TickWork {
    /// True when the stream has nothing left at `t`.
    fn end_of_stream(&self, t: f64) -> bool;
    /// Produce and deliver tick `idx` at output time `t`.
    fn tick(&mut self, idx: FrameIndex, t: f64) -> ReelResult<()>;
}

/// State machine and paced tick loop.
///
/// Pacing is open loop: after each tick the scheduler waits `max(0, interval - elapsed)` on its
/// [`Clock`]. A slow tick shortens nothing that follows, so overruns are not repaid.
pub struct Scheduler {
    fps: Fps,
    total_ticks: u64,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    state: SessionState,
    history: Vec<SessionState>,
    ticks: u64,
}

impl Scheduler {
    /// Idle scheduler for `total_ticks` ticks at `fps`.
    pub fn new(fps: Fps, total_ticks: u64, clock: Arc<dyn Clock>, cancel: CancelToken) -> Self {
        Self {
            fps,
            total_ticks,
            clock,
            cancel,
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
            ticks: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Upper bound on ticks.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub(crate) fn advance(&mut self, next: SessionState) -> ReelResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(ReelError::evaluation(format!(
                "invalid session transition {:?} -> {:?}",
                self.state, next
            )));
        }
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Record the terminal state for `result`.
    pub(crate) fn conclude<T>(&mut self, result: &ReelResult<T>) -> ReelResult<()> {
        let next = match result {
            Ok(_) => SessionState::Complete,
            Err(e) => SessionState::Failed(e.failure_reason()),
        };
        self.advance(next)
    }

    /// Run ticks `0..total_ticks` until the work reports end-of-stream.
    ///
    /// The cancel flag is checked once per tick, before any work for that tick.
    pub(crate) fn run_ticks(&mut self, work: &mut dyn TickWork) -> ReelResult<u64> {
        if self.state != SessionState::Running {
            return Err(ReelError::evaluation("scheduler is not running"));
        }
        let interval = self.fps.tick_interval();
        for n in self.ticks..self.total_ticks {
            if self.cancel.is_cancelled() {
                tracing::debug!(tick = n, "cancellation observed");
                return Err(ReelError::Cancelled);
            }
            let idx = FrameIndex(n);
            let t = self.fps.frame_time_secs(idx);
            if work.end_of_stream(t) {
                tracing::debug!(tick = n, t, "end of stream");
                break;
            }

            let started = self.clock.elapsed();
            work.tick(idx, t)?;
            self.ticks = n + 1;

            let spent = self.clock.elapsed().saturating_sub(started);
            let wait = interval.saturating_sub(spent);
            if wait.is_zero() {
                self.clock.yield_now();
            } else {
                self.clock.sleep(wait);
            }
        }
        Ok(self.ticks)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/scheduler.rs"]
mod tests;
