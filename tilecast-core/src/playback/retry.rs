//! Retry coordination for fatal playback errors.
//!
//! Engines tend to report the same failure several times in a row. The
//! coordinator keeps at most one pending retry per session no matter how
//! many errors arrive, and drops the pending retry as soon as the engine
//! starts loading again. The attempt count of a failure streak survives
//! that, so a stream that buffers and then fails on every reload still
//! reaches the attempt cap; only actual playback resets it.

use std::time::{Duration, Instant};

use crate::config::RetryPolicy;

/// Retry lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No retry pending
    Idle,
    /// A retry will fire at `next_attempt_at`
    Scheduled {
        next_attempt_at: Instant,
        attempt_count: u32,
    },
    /// The source was just reissued and the loop awaits re-arming
    InFlight { attempt_count: u32 },
}

/// Outcome of a due retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Engine is playing again; the retry was dropped
    Abandoned,
    /// Caller should reissue the source on the engine
    Reissue { attempt: u32 },
}

/// Shortest delay between a failure and its reissue.
const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Tracks the single pending retry of a playback session.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
    state: RetryState,
    attempts: u32,
    exhausted: bool,
}

impl RetryCoordinator {
    pub fn new(mut policy: RetryPolicy) -> Self {
        policy.interval = policy.interval.max(MIN_RETRY_INTERVAL);
        Self {
            policy,
            state: RetryState::Idle,
            attempts: 0,
            exhausted: false,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self.state, RetryState::Idle)
    }

    /// Time the pending retry fires, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            RetryState::Scheduled {
                next_attempt_at, ..
            } => Some(next_attempt_at),
            _ => None,
        }
    }

    /// Reissues made in the current failure streak.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the attempt cap was reached since the last [`Self::cancel`].
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Reacts to a fatal engine error.
    ///
    /// Schedules a retry only when none is pending and the attempt cap has
    /// not been reached. Returns whether a new retry was scheduled.
    pub fn on_fatal_error(&mut self, now: Instant) -> bool {
        if self.is_pending() || self.exhausted {
            return false;
        }
        self.state = RetryState::Scheduled {
            next_attempt_at: now + self.policy.interval,
            attempt_count: self.attempts,
        };
        true
    }

    /// Fires the retry if it is due.
    ///
    /// Returns `None` when nothing is due. A due retry on an engine that is
    /// already playing is abandoned; otherwise the state moves to in-flight
    /// and the caller must reissue the source, then call [`Self::rearm`].
    pub fn fire(&mut self, now: Instant, is_playing: bool) -> Option<RetryAction> {
        let RetryState::Scheduled {
            next_attempt_at,
            attempt_count,
        } = self.state
        else {
            return None;
        };
        if now < next_attempt_at {
            return None;
        }

        if is_playing {
            self.cancel();
            return Some(RetryAction::Abandoned);
        }

        let attempt = attempt_count + 1;
        self.attempts = attempt;
        self.state = RetryState::InFlight {
            attempt_count: attempt,
        };
        Some(RetryAction::Reissue { attempt })
    }

    /// Schedules the follow-up check after a reissue.
    ///
    /// Returns false when the attempt cap is reached and the coordinator
    /// gave up.
    pub fn rearm(&mut self, now: Instant) -> bool {
        let RetryState::InFlight { attempt_count } = self.state else {
            return self.is_pending();
        };

        if self
            .policy
            .max_attempts
            .is_some_and(|max| attempt_count >= max)
        {
            self.state = RetryState::Idle;
            self.exhausted = true;
            return false;
        }

        self.state = RetryState::Scheduled {
            next_attempt_at: now + self.policy.interval,
            attempt_count,
        };
        true
    }

    /// Drops the pending retry while the engine loads again.
    ///
    /// The streak's attempt count and exhaustion are kept, so the next
    /// fatal error continues counting where this one left off.
    pub fn suspend(&mut self) {
        self.state = RetryState::Idle;
    }

    /// Drops any pending retry and starts a fresh failure streak.
    pub fn cancel(&mut self) {
        self.state = RetryState::Idle;
        self.attempts = 0;
        self.exhausted = false;
    }
}
