//! Retry wrapper for backend calls
//!
//! Remote filesystems fail for reasons that heal by themselves: a dropped
//! control connection, a timed-out handshake, a server mid-restart. Every
//! backend mutation and lookup the engine makes goes through [`with_retry`],
//! which re-attempts such failures a bounded number of times with a fixed
//! delay. What counts as worth retrying is decided in one place,
//! [`FerryError::is_transient`](crate::error::FerryError::is_transient).

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Retry budget for backend calls
///
/// `max_retries` is the number of *extra* attempts a failing call gets, so a
/// policy of 3 allows 4 attempts in total. The wait is a flat delay between
/// attempts; there is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub max_retries: u32,
    /// Delay between attempts
    pub wait: Duration,
}

impl RetryPolicy {
    /// Create a policy from a retry count and a wait in milliseconds
    pub fn new(max_retries: u32, wait_ms: u64) -> Self {
        Self {
            max_retries,
            wait: Duration::from_millis(wait_ms),
        }
    }

    /// Policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            wait: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Run a fallible backend call under a retry policy
///
/// The call is attempted once and re-attempted after `policy.wait` while the
/// failure is transient and budget remains. When the budget is exhausted the
/// last error is returned. Definitive errors — a lock conflict, a missing
/// directory, a bad configuration — are returned from the attempt that hit
/// them, whatever the remaining budget.
pub fn with_retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt: u32 = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                debug!(
                    "backend call failed ({}), retry {}/{} after {:?}",
                    e, attempt, policy.max_retries, policy.wait
                );
                thread::sleep(policy.wait);
            }
            Err(e) => return Err(e),
        }
    }
}
