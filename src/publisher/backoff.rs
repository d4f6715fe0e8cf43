//! Exponential backoff state machine used by the asynchronous worker.
//!
//! After a failed stream send the worker suspends delivery for the delay
//! returned by [`BackoffState::next_delay`]. Delays double up to the policy cap
//! and are jittered; once the failure streak outlives the policy deadline no
//! further suspension is requested and every message triggers a reconnect.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::config::BackoffPolicy;

const MIN_DELAY_MS: u64 = 10;

/// Tracks reconnection attempts and produces jittered delays.
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    failure_since: Option<Instant>,
    last_success: Option<Instant>,
    rng: StdRng,
}

impl BackoffState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            failure_since: None,
            last_success: None,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Record a successful send.
    pub fn record_success(&mut self, now: Instant) {
        self.last_success = Some(now);
        if let Some(start) = self.failure_since
            && now.duration_since(start) >= self.policy.reset_after
        {
            self.current = self.policy.base;
            self.failure_since = None;
        }
    }

    /// Reset the backoff window after a sustained period without failures.
    pub fn reset_after_idle(&mut self, now: Instant) {
        if let Some(success) = self.last_success
            && now.duration_since(success) >= self.policy.reset_after
        {
            self.current = self.policy.base;
            self.failure_since = None;
            self.last_success = None;
        }
    }

    /// Delay before the next connection attempt, or `None` past the deadline.
    pub fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        let start = *self.failure_since.get_or_insert(now);

        if now.duration_since(start) >= self.policy.deadline {
            return None;
        }

        if now != start {
            self.current = self.current.saturating_mul(2).min(self.policy.cap);
        }

        let max_ms = u64::try_from(self.current.as_millis()).unwrap_or(u64::MAX);
        let delay_ms = match max_ms {
            0 => MIN_DELAY_MS,
            1..=MIN_DELAY_MS => max_ms,
            _ => self.rng.gen_range(MIN_DELAY_MS..=max_ms),
        };
        Some(Duration::from_millis(delay_ms))
    }

    /// Whether a failure streak is in progress.
    pub fn is_failing(&self) -> bool {
        self.failure_since.is_some()
    }
}
