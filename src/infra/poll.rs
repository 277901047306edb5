//! Bounded polling primitive for asynchronous resource creation.
//!
//! Cloud resources settle into a terminal state on their own schedule; this
//! module polls a fetch function until a caller-supplied predicate holds or
//! the wall-clock budget runs out. Progress reporting, if any, belongs to
//! the caller, not here.

use std::future::Future;
use std::time::{Duration, Instant};

/// How often to poll and for how long.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Result of a poll that did not fail outright.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// The predicate held; carries the last fetched value.
    Settled(T),
    /// The budget elapsed while the predicate never held.
    TimedOut,
}

/// Poll `fetch` until `settled` holds for its result or the budget elapses.
///
/// The deadline is checked after each fetch, and the sleep before the next
/// attempt never overshoots it, so a timeout is reported at the budget and
/// not an interval later. Fetch errors abort the poll immediately.
pub async fn poll_until<T, E, F, Fut, P>(
    config: &PollConfig,
    mut fetch: F,
    settled: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        let value = fetch().await?;
        if settled(&value) {
            return Ok(PollOutcome::Settled(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut);
        }
        tokio::time::sleep(config.interval.min(deadline - now)).await;
    }
}
