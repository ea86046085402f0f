//! Bounded fixed-interval polling.
//!
//! [`poll_until`] repeatedly fetches a value until a predicate accepts it or
//! the attempt budget runs out. It knows nothing about what is being
//! polled; callers decide what "done" means.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// How often and how many times to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two consecutive fetches.
    pub interval: Duration,
    /// Maximum number of fetches.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    /// Create a policy, rejecting a zero attempt budget.
    pub fn new(interval: Duration, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config("poll max_attempts must be at least 1".into()));
        }
        Ok(Self {
            interval,
            max_attempts,
        })
    }

    /// Upper bound on time spent sleeping between fetches.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Result of a completed poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The predicate accepted `value` on fetch number `attempts`.
    Ready { value: T, attempts: u32 },
    /// The budget ran out; `last` is the final value fetched, if any.
    Exhausted { last: Option<T>, attempts: u32 },
}

impl<T> PollOutcome<T> {
    /// The last value observed, whether or not it satisfied the predicate.
    pub const fn last(&self) -> Option<&T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::Exhausted { last, .. } => last.as_ref(),
        }
    }

    /// Number of fetches performed.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Call `fetch` until `is_done` accepts its value or `policy.max_attempts`
/// fetches have been made, sleeping `policy.interval` between fetches.
///
/// `fetch` receives the 1-based attempt number. The first error returned by
/// `fetch` ends the loop and is propagated unchanged.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    mut fetch: F,
    is_done: P,
) -> std::result::Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut last = None;
    for attempt in 1..=policy.max_attempts {
        let value = fetch(attempt).await?;
        if is_done(&value) {
            trace!(attempt, "Poll condition met");
            return Ok(PollOutcome::Ready {
                value,
                attempts: attempt,
            });
        }
        last = Some(value);
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    debug!(
        attempts = policy.max_attempts,
        interval_ms = u64::try_from(policy.interval.as_millis()).unwrap_or(u64::MAX),
        "Poll budget exhausted"
    );
    Ok(PollOutcome::Exhausted {
        last,
        attempts: policy.max_attempts,
    })
}
