//! Bounded exponential backoff for report submission

use std::time::Duration;

/// Backoff applied between submission attempts of one report cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }

    /// All retry delays of one cycle, in order
    pub fn delays(&self) -> Vec<Duration> {
        (1..=self.max_retries)
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect()
    }
}

/// Per-cycle retry bookkeeping; a fresh one is created for every cycle.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt_count: u32,
    current_delay: Duration,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt_count: 0,
            current_delay: Duration::ZERO,
        }
    }

    /// Retries consumed so far
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Advances to the next retry, returning its delay, or `None` once the
    /// retry ceiling is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt_count >= self.policy.max_retries {
            return None;
        }
        self.attempt_count += 1;
        self.current_delay = self.policy.delay_for_attempt(self.attempt_count);
        Some(self.current_delay)
    }
}
