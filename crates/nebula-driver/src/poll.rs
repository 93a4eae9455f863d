//! Bounded polling of eventually-consistent remote state.

use nebula_common::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// How often to poll and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two polls
    pub interval: Duration,
    /// Give up after this many polls
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since the first poll
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    /// Poll at most `max_attempts` times.
    pub fn attempts(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
            timeout: None,
        }
    }

    /// Poll until `timeout` has elapsed.
    pub fn deadline(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            timeout: Some(timeout),
        }
    }

    fn exhausted(&self, attempts: u32, started: Instant) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self
                .timeout
                .is_some_and(|timeout| started.elapsed() + self.interval > timeout)
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The awaited condition holds.
    Ready(T),
    /// Not there yet; carries what was observed for diagnostics.
    Pending(String),
}

/// Call `step` until it reports [`Step::Ready`].
///
/// An error returned by `step` ends polling immediately. There is no sleep
/// after the last attempt.
///
/// # Errors
/// Returns [`Error::Timeout`] when the policy is exhausted.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, what: &str, mut step: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Step<T>>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let observed = match step().await? {
            Step::Ready(value) => {
                tracing::debug!(
                    what,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Poll condition reached"
                );
                return Ok(value);
            }
            Step::Pending(observed) => observed,
        };

        tracing::trace!(what, attempt = attempts, observed = %observed, "Not ready, retrying...");

        if policy.exhausted(attempts, started) {
            tracing::warn!(
                what,
                attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                last_observed = %observed,
                "Poll budget exhausted"
            );
            return Err(Error::Timeout {
                what: what.to_string(),
                attempts,
                last_observed: observed,
            });
        }

        sleep(policy.interval).await;
    }
}
