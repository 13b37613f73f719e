//! Retry policy for calls to the remote authority
//!
//! A policy is a `(limit, delay)` pair. The limit counts attempts, not
//! retries: `Bounded(3)` means at most three calls. Unattended farming uses
//! [`RetryLimit::Unbounded`] instead of a very large number.

use std::time::Duration;

/// How many attempts an operation gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// At most this many attempts; zero is treated as a single attempt
    Bounded(u32),
    /// Never give up on transient failures
    Unbounded,
}

/// Retry configuration attached to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub limit: RetryLimit,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: RetryLimit::Bounded(crate::DEFAULT_RETRY_LIMIT),
            delay: Duration::from_secs(crate::DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn bounded(attempts: u32, delay: Duration) -> Self {
        Self {
            limit: RetryLimit::Bounded(attempts),
            delay,
        }
    }

    pub fn unbounded(delay: Duration) -> Self {
        Self {
            limit: RetryLimit::Unbounded,
            delay,
        }
    }

    /// Same delay, no attempt limit
    pub fn into_unbounded(self) -> Self {
        Self::unbounded(self.delay)
    }

    /// Maximum number of attempts, `None` if unbounded
    pub fn max_attempts(&self) -> Option<u64> {
        match self.limit {
            RetryLimit::Bounded(n) => Some(u64::from(n.max(1))),
            RetryLimit::Unbounded => None,
        }
    }

    /// Whether another attempt may follow `attempts_made` failed ones
    pub fn allows_another(&self, attempts_made: u64) -> bool {
        match self.max_attempts() {
            Some(max) => attempts_made < max,
            None => true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit == RetryLimit::Unbounded
    }
}
