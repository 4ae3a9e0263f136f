//! Bounded retry bookkeeping for one scheduled tick

/// What the scheduler should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Exhausted,
}

/// Attempt counter for a single tick. `max_retries = 0` still allows one attempt.
#[derive(Debug, Clone)]
pub struct RunAttempt {
    attempt: u32,
    max_attempts: u32,
}

impl RunAttempt {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_retries.max(1),
        }
    }

    /// Failed attempts so far (0-based index of the running attempt)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 1-based number of the running attempt, for logging
    pub fn number(&self) -> u32 {
        self.attempt + 1
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempt += 1;
        if self.attempt < self.max_attempts {
            RetryDecision::Retry
        } else {
            RetryDecision::Exhausted
        }
    }
}
