//! Container status polling as an explicit state machine.
//!
//! [`PollTracker::observe`] folds each status check into a [`PollState`];
//! [`PollTracker::next_delay`] says how long to wait before the next check,
//! never overshooting the wall-clock budget.

use std::time::{Duration, Instant};

use crate::status::ContainerStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    AwaitingStatus,
    Ready,
    Error(ContainerStatus),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct PollTracker {
    interval: Duration,
    max_wait: Duration,
    started: Instant,
    checks: u32,
    last_status: ContainerStatus,
    state: PollState,
}

impl PollTracker {
    #[must_use]
    pub fn new(interval: Duration, max_wait: Duration, started: Instant) -> Self {
        Self {
            interval,
            max_wait,
            started,
            checks: 0,
            last_status: ContainerStatus::Unknown(String::new()),
            state: PollState::AwaitingStatus,
        }
    }

    #[must_use]
    pub fn state(&self) -> &PollState {
        &self.state
    }

    #[must_use]
    pub fn last_status(&self) -> &ContainerStatus {
        &self.last_status
    }

    #[must_use]
    pub fn checks(&self) -> u32 {
        self.checks
    }

    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Record the outcome of one status check made at `now`. `None` means
    /// the check itself failed; polling continues within budget.
    pub fn observe(&mut self, status: Option<ContainerStatus>, now: Instant) -> &PollState {
        if self.is_terminal() {
            return &self.state;
        }
        self.checks += 1;
        if let Some(status) = status {
            self.last_status = status;
        }
        self.state = match self.last_status {
            ContainerStatus::Finished | ContainerStatus::Published => PollState::Ready,
            ContainerStatus::Error | ContainerStatus::Expired => {
                PollState::Error(self.last_status.clone())
            }
            _ if self.elapsed(now) >= self.max_wait => PollState::TimedOut,
            _ => PollState::AwaitingStatus,
        };
        &self.state
    }

    /// Delay before the next check, clipped to the remaining budget. `None`
    /// once the budget is spent; the tracker is then [`PollState::TimedOut`].
    pub fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        if self.is_terminal() {
            return None;
        }
        let remaining = self.max_wait.saturating_sub(self.elapsed(now));
        if remaining.is_zero() {
            self.state = PollState::TimedOut;
            return None;
        }
        Some(self.interval.min(remaining))
    }

    fn is_terminal(&self) -> bool {
        !matches!(self.state, PollState::AwaitingStatus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn finished_is_ready() {
        let t0 = Instant::now();
        let mut tracker = PollTracker::new(secs(5), secs(60), t0);
        assert_eq!(
            tracker.observe(Some(ContainerStatus::InProgress), t0),
            &PollState::AwaitingStatus
        );
        assert_eq!(
            tracker.observe(Some(ContainerStatus::Finished), t0 + secs(5)),
            &PollState::Ready
        );
        assert_eq!(tracker.checks(), 2);
    }

    #[test]
    fn error_on_first_check_is_terminal() {
        let t0 = Instant::now();
        let mut tracker = PollTracker::new(secs(5), secs(60), t0);
        assert_eq!(
            tracker.observe(Some(ContainerStatus::Error), t0),
            &PollState::Error(ContainerStatus::Error)
        );
        assert!(tracker.next_delay(t0).is_none());
        // Later observations cannot resurrect a terminal tracker.
        assert_eq!(
            tracker.observe(Some(ContainerStatus::Finished), t0 + secs(1)),
            &PollState::Error(ContainerStatus::Error)
        );
    }

    #[test]
    fn budget_exhaustion_times_out() {
        let t0 = Instant::now();
        let mut tracker = PollTracker::new(secs(5), secs(12), t0);
        assert_eq!(tracker.next_delay(t0), Some(secs(5)));
        assert_eq!(tracker.next_delay(t0 + secs(10)), Some(secs(2)));
        assert_eq!(
            tracker.observe(Some(ContainerStatus::InProgress), t0 + secs(12)),
            &PollState::TimedOut
        );
    }

    #[test]
    fn failed_check_keeps_last_known_status() {
        let t0 = Instant::now();
        let mut tracker = PollTracker::new(secs(5), secs(60), t0);
        tracker.observe(Some(ContainerStatus::InProgress), t0);
        tracker.observe(None, t0 + secs(5));
        assert_eq!(tracker.last_status(), &ContainerStatus::InProgress);
        assert_eq!(tracker.state(), &PollState::AwaitingStatus);
    }

    #[test]
    fn next_delay_at_deadline_marks_timeout() {
        let t0 = Instant::now();
        let mut tracker = PollTracker::new(secs(5), secs(10), t0);
        assert!(tracker.next_delay(t0 + secs(10)).is_none());
        assert_eq!(tracker.state(), &PollState::TimedOut);
    }
}
