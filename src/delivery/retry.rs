//! Retry policy for nacked hand-offs.
//!
//! `RetryPolicy::immediate()` retries the same head forever with no delay.
//! The default policy is bounded and backs off exponentially with jitter;
//! once the bound is hit the head is abandoned and the queue moves on.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the delivery queue reacts to a failed hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum hand-offs per message (including the first). `None` = unbounded.
    pub max_attempts: Option<u32>,
    /// Delay before the first retry. Doubles for each later retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Jitter fraction (0.0 to 1.0) applied to each delay.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.1,
        }
    }
}

/// What to do with the head after a failed hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the same message off again after the delay.
    RetryAfter(Duration),
    /// Drop the message and move on.
    GiveUp,
}

impl RetryPolicy {
    /// Retry forever, immediately.
    pub fn immediate() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    /// Decide after `attempts` failed hand-offs of the same message.
    pub fn decide(&self, attempts: u32) -> RetryDecision {
        match self.max_attempts {
            Some(max) if attempts >= max => RetryDecision::GiveUp,
            _ => RetryDecision::RetryAfter(self.delay_for(attempts)),
        }
    }

    /// Backoff before hand-off number `attempts + 1`.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = attempts.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        if self.jitter_factor <= 0.0 {
            return delay;
        }

        let jitter = self.jitter_factor.min(1.0);
        let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
        delay.mul_f64(factor).min(self.max_delay)
    }
}
