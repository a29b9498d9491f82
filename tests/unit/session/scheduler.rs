use std::time::Duration;

use super::*;
use crate::foundation::clock::ManualClock;

struct CountingWork {
    clock: ManualClock,
    ticks: Vec<(u64, f64)>,
    eos_from: Option<f64>,
    cost: Vec<Duration>,
    cancel_after: Option<(u64, CancelToken)>,
    fail_at: Option<u64>,
}

impl CountingWork {
    fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            ticks: Vec::new(),
            eos_from: None,
            cost: Vec::new(),
            cancel_after: None,
            fail_at: None,
        }
    }
}

impl TickWork for CountingWork {
    fn end_of_stream(&self, t: f64) -> bool {
        self.eos_from.is_some_and(|eos| t >= eos)
    }

    fn tick(&mut self, idx: FrameIndex, t: f64) -> ReelResult<()> {
        if self.fail_at == Some(idx.0) {
            return Err(ReelError::evaluation("boom"));
        }
        if let Some(d) = self.cost.get(idx.0 as usize) {
            self.clock.advance(*d);
        }
        self.ticks.push((idx.0, t));
        if let Some((n, token)) = &self.cancel_after
            && idx.0 + 1 == *n
        {
            token.cancel();
        }
        Ok(())
    }
}

fn running(fps: u32, total: u64, clock: &ManualClock, cancel: CancelToken) -> Scheduler {
    let mut s = Scheduler::new(
        Fps::new(fps, 1).unwrap(),
        total,
        Arc::new(clock.clone()),
        cancel,
    );
    s.advance(SessionState::Priming).unwrap();
    s.advance(SessionState::Running).unwrap();
    s
}

#[test]
fn paces_every_tick_by_one_interval() {
    let clock = ManualClock::new();
    let mut s = running(30, 450, &clock, CancelToken::new());
    let mut work = CountingWork::new(&clock);
    assert_eq!(s.run_ticks(&mut work).unwrap(), 450);
    assert_eq!(work.ticks.len(), 450);
    assert_eq!(work.ticks[0], (0, 0.0));
    assert!((work.ticks[30].1 - 1.0).abs() < 1e-12);
    let interval = Fps::new(30, 1).unwrap().tick_interval();
    assert_eq!(clock.elapsed(), interval * 450);
}

#[test]
fn overruns_are_not_repaid() {
    let clock = ManualClock::new();
    let interval = Fps::new(10, 1).unwrap().tick_interval();
    let mut s = running(10, 4, &clock, CancelToken::new());
    let mut work = CountingWork::new(&clock);
    // Tick 1 takes three intervals; the others are free.
    work.cost = vec![Duration::ZERO, interval * 3, Duration::ZERO, Duration::ZERO];
    s.run_ticks(&mut work).unwrap();
    // 1 + 3 + 1 + 1: the slow tick waits nothing and later ticks still wait a full interval.
    assert_eq!(clock.elapsed(), interval * 6);
}

#[test]
fn partial_overrun_waits_the_remainder() {
    let clock = ManualClock::new();
    let interval = Duration::from_millis(100);
    let mut s = running(10, 1, &clock, CancelToken::new());
    let mut work = CountingWork::new(&clock);
    work.cost = vec![Duration::from_millis(40)];
    s.run_ticks(&mut work).unwrap();
    assert_eq!(clock.elapsed(), interval);
}

#[test]
fn stops_at_end_of_stream() {
    let clock = ManualClock::new();
    let mut s = running(10, 100, &clock, CancelToken::new());
    let mut work = CountingWork::new(&clock);
    work.eos_from = Some(0.5);
    assert_eq!(s.run_ticks(&mut work).unwrap(), 5);
    assert_eq!(s.ticks(), 5);
}

#[test]
fn cancellation_is_observed_before_the_next_tick() {
    let clock = ManualClock::new();
    let token = CancelToken::new();
    let mut s = running(10, 100, &clock, token.clone());
    let mut work = CountingWork::new(&clock);
    work.cancel_after = Some((3, token.clone()));
    let err = s.run_ticks(&mut work).unwrap_err();
    assert!(matches!(err, ReelError::Cancelled));
    assert_eq!(work.ticks.len(), 3);
    assert_eq!(s.ticks(), 3);
}

#[test]
fn tick_errors_propagate() {
    let clock = ManualClock::new();
    let mut s = running(10, 10, &clock, CancelToken::new());
    let mut work = CountingWork::new(&clock);
    work.fail_at = Some(2);
    assert!(s.run_ticks(&mut work).is_err());
    assert_eq!(s.ticks(), 2);
}

#[test]
fn run_requires_running_state() {
    let clock = ManualClock::new();
    let mut s = Scheduler::new(
        Fps::new(10, 1).unwrap(),
        10,
        Arc::new(clock.clone()),
        CancelToken::new(),
    );
    let mut work = CountingWork::new(&clock);
    assert!(s.run_ticks(&mut work).is_err());
    assert!(work.ticks.is_empty());
}

#[test]
fn state_machine_rejects_skips_and_records_history() {
    let clock = ManualClock::new();
    let mut s = Scheduler::new(
        Fps::new(10, 1).unwrap(),
        1,
        Arc::new(clock),
        CancelToken::new(),
    );
    assert!(s.advance(SessionState::Running).is_err());
    assert!(s.advance(SessionState::Complete).is_err());
    s.advance(SessionState::Priming).unwrap();
    s.advance(SessionState::Draining).unwrap();
    s.conclude::<()>(&Err(ReelError::NoFramesCaptured)).unwrap();
    assert_eq!(
        s.state(),
        SessionState::Failed(FailureReason::NoFramesCaptured)
    );
    assert!(s.state().is_terminal());
    assert_eq!(
        s.history(),
        &[
            SessionState::Idle,
            SessionState::Priming,
            SessionState::Draining,
            SessionState::Failed(FailureReason::NoFramesCaptured),
        ]
    );
    assert!(s.advance(SessionState::Priming).is_err());
}

#[test]
fn cancel_token_clones_share_the_flag() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(!b.is_cancelled());
    a.cancel();
    assert!(b.is_cancelled());
}
