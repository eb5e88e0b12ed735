//! Adaptive wait computation for throttled (`429`) responses.

use std::{fmt, time::Duration};

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Lowest backoff step. `fib(9)` is 34 seconds.
pub const BACKOFF_FLOOR: u32 = 9;

/// Decides whether a throttled request is retried after `wait`.
///
/// The session sleeps for `wait` before retrying when this returns `true`.
/// Returning `false` surfaces the `429` response as an API error. Callers that
/// want an upper bound on the wait enforce it here.
pub trait RateLimitPolicy: Send + Sync {
    fn should_retry(&self, wait: Duration) -> bool;
}

impl<F> RateLimitPolicy for F
where
    F: Fn(Duration) -> bool + Send + Sync,
{
    fn should_retry(&self, wait: Duration) -> bool {
        self(wait)
    }
}

/// The `n`-th Fibonacci number (`fib(0) == 0`), saturating at `u64::MAX`.
pub fn fib(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}

/// Positive integer `Retry-After` seconds, if the server sent one.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|seconds| *seconds > 0)
}

/// Per-session backoff step.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    step: u32,
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backoff(step={})", self.step)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            step: BACKOFF_FLOOR,
        }
    }
}

impl Backoff {
    pub fn step(&self) -> u32 {
        self.step
    }

    /// A non-throttled response: forgive one step of prior escalation.
    pub fn relax(&mut self) {
        if self.step > BACKOFF_FLOOR {
            self.step -= 1;
        }
    }

    /// A throttled response: returns how long to wait.
    ///
    /// A server hint is used verbatim and resets the step to the floor.
    /// Otherwise the wait is `fib(step)` and the step grows by one.
    pub fn throttled(&mut self, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(seconds) => {
                self.step = BACKOFF_FLOOR;
                Duration::from_secs(seconds)
            }
            None => {
                let wait = Duration::from_secs(fib(self.step));
                self.step = self.step.saturating_add(1);
                wait
            }
        }
    }
}
