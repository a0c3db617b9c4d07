//! Visibility-aware poll scheduler.
//!
//! A pure state machine driven by three inputs (timer tick, visibility
//! change, terminal observation) so pause/resume and single-terminal
//! delivery are testable without a clock or a network. The async drivers
//! in `tracker` and `health` own the actual timer and HTTP calls.

use std::time::Duration;

/// Fixed poll cadence while the host is in the foreground.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Hard cap on polls per tracked job. At the default cadence this is a
/// five minute window; a job still running past it is reported as
/// timed out on this side even though the server may yet finish it.
pub const DEFAULT_MAX_POLLS: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    Paused,
    Terminal,
}

/// What the driver should do after feeding the machine one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Issue one poll request now.
    Poll,
    /// Do nothing until the next input.
    Hold,
    /// Poll budget exhausted; deliver the timeout outcome and stop.
    TimedOut,
}

/// Poll scheduling discipline shared by the job tracker and the health
/// watcher.
///
/// Polls fire on timer ticks while `Polling`; losing visibility pauses
/// them entirely; regaining it issues one immediate poll and resumes
/// the cadence. Once `Terminal`, every input is a no-op, so a terminal
/// outcome can never be delivered twice.
#[derive(Debug)]
pub struct PollScheduler {
    state: SchedulerState,
    polls_issued: u32,
    max_polls: Option<u32>,
}

impl PollScheduler {
    /// A scheduler with a hard poll budget. `None` polls forever.
    pub fn new(max_polls: Option<u32>) -> Self {
        Self {
            state: SchedulerState::Idle,
            polls_issued: 0,
            max_polls,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn polls_issued(&self) -> u32 {
        self.polls_issued
    }

    /// Begin polling. No-op unless idle; the first poll fires on the
    /// first timer tick.
    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Polling;
        }
    }

    /// Timer tick.
    pub fn on_tick(&mut self) -> PollAction {
        match self.state {
            SchedulerState::Polling => self.issue(),
            _ => PollAction::Hold,
        }
    }

    /// Host visibility changed. Losing visibility pauses polling;
    /// regaining it issues one immediate poll before the cadence
    /// resumes.
    pub fn on_visibility(&mut self, visible: bool) -> PollAction {
        match (self.state, visible) {
            (SchedulerState::Polling, false) => {
                self.state = SchedulerState::Paused;
                PollAction::Hold
            }
            (SchedulerState::Paused, true) => {
                self.state = SchedulerState::Polling;
                self.issue()
            }
            _ => PollAction::Hold,
        }
    }

    /// Record that a poll observed a terminal outcome. Returns `true`
    /// exactly once; the caller delivers the outcome only on `true`.
    pub fn finish(&mut self) -> bool {
        if self.state == SchedulerState::Terminal {
            return false;
        }
        self.state = SchedulerState::Terminal;
        true
    }

    fn issue(&mut self) -> PollAction {
        if let Some(max) = self.max_polls {
            if self.polls_issued >= max {
                self.state = SchedulerState::Terminal;
                return PollAction::TimedOut;
            }
        }
        self.polls_issued += 1;
        PollAction::Poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_issue_polls_while_visible() {
        let mut s = PollScheduler::new(Some(10));
        s.start();
        assert_eq!(s.on_tick(), PollAction::Poll);
        assert_eq!(s.on_tick(), PollAction::Poll);
        assert_eq!(s.polls_issued(), 2);
    }

    #[test]
    fn test_tick_before_start_is_a_noop() {
        let mut s = PollScheduler::new(Some(10));
        assert_eq!(s.on_tick(), PollAction::Hold);
        assert_eq!(s.polls_issued(), 0);
    }

    #[test]
    fn test_backgrounding_pauses_and_foregrounding_polls_immediately() {
        let mut s = PollScheduler::new(Some(100));
        s.start();
        assert_eq!(s.on_tick(), PollAction::Poll);

        assert_eq!(s.on_visibility(false), PollAction::Hold);
        assert_eq!(s.state(), SchedulerState::Paused);

        // Backgrounded for many tick periods: not a single poll fires.
        for _ in 0..30 {
            assert_eq!(s.on_tick(), PollAction::Hold);
        }
        assert_eq!(s.polls_issued(), 1);

        // Exactly one immediate poll on foreground, then cadence resumes.
        assert_eq!(s.on_visibility(true), PollAction::Poll);
        assert_eq!(s.polls_issued(), 2);
        assert_eq!(s.on_tick(), PollAction::Poll);
    }

    #[test]
    fn test_budget_exhaustion_times_out_exactly_once() {
        let mut s = PollScheduler::new(Some(3));
        s.start();
        for _ in 0..3 {
            assert_eq!(s.on_tick(), PollAction::Poll);
        }
        assert_eq!(s.on_tick(), PollAction::TimedOut);
        assert_eq!(s.state(), SchedulerState::Terminal);

        // Terminal already delivered: further inputs are inert.
        assert_eq!(s.on_tick(), PollAction::Hold);
        assert_eq!(s.on_visibility(true), PollAction::Hold);
        assert!(!s.finish());
    }

    #[test]
    fn test_terminal_outcome_delivered_once() {
        let mut s = PollScheduler::new(Some(10));
        s.start();
        assert_eq!(s.on_tick(), PollAction::Poll);
        assert!(s.finish());
        assert!(!s.finish());
        assert_eq!(s.on_tick(), PollAction::Hold);
    }

    #[test]
    fn test_unbounded_never_times_out() {
        let mut s = PollScheduler::unbounded();
        s.start();
        for _ in 0..10_000 {
            assert_eq!(s.on_tick(), PollAction::Poll);
        }
    }

    #[test]
    fn test_visibility_noop_when_idle() {
        let mut s = PollScheduler::new(Some(10));
        assert_eq!(s.on_visibility(false), PollAction::Hold);
        assert_eq!(s.on_visibility(true), PollAction::Hold);
        assert_eq!(s.state(), SchedulerState::Idle);
    }
}
