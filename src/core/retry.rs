//! Retry Policy (part of C5, §4.5): per-class caps and backoff formulas.

use std::time::Duration;

use crate::core::outcome::FailureClass;
use crate::core::registry::AttemptCounters;

/// Retry cap for a given failure class.
pub fn cap(class: FailureClass) -> u32 {
    match class {
        FailureClass::General => 6,
        FailureClass::RateLimited => 10,
        FailureClass::Timeout => 6,
    }
}

/// Attempts-so-far for a given failure class, read off a task's counters.
pub fn attempts_for(class: FailureClass, counters: &AttemptCounters) -> u32 {
    match class {
        FailureClass::General => counters.general_attempts,
        FailureClass::RateLimited => counters.rate_limit_attempts,
        FailureClass::Timeout => counters.timeout_attempts,
    }
}

/// Increment the counter for a given failure class, returning the new counters.
pub fn increment(class: FailureClass, counters: AttemptCounters) -> AttemptCounters {
    let mut c = counters;
    match class {
        FailureClass::General => c.general_attempts += 1,
        FailureClass::RateLimited => c.rate_limit_attempts += 1,
        FailureClass::Timeout => c.timeout_attempts += 1,
    }
    c
}

/// Whether the cap for `class` has been reached given the *post-increment*
/// attempt count `n`.
pub fn cap_reached(class: FailureClass, n: u32) -> bool {
    n >= cap(class)
}

/// Backoff delay for failure class `class` at 1-based attempt `n`.
///
/// - general: `2^(n+1) + uniform(0, 2.0)` s
/// - rate_limited: `2^min(6, n+1) + uniform(0, 2.0)` s
/// - timeout: `5.0*n + uniform(0, 3.0)` s
pub fn backoff(class: FailureClass, n: u32) -> Duration {
    let secs = match class {
        FailureClass::General => 2f64.powi((n + 1) as i32) + fastrand::f64() * 2.0,
        FailureClass::RateLimited => {
            let exp = (n + 1).min(6);
            2f64.powi(exp as i32) + fastrand::f64() * 2.0
        }
        FailureClass::Timeout => 5.0 * n as f64 + fastrand::f64() * 3.0,
    };
    Duration::from_secs_f64(secs)
}
