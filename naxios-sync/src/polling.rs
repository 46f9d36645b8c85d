//! Poll an async probe until a predicate holds.
//!
//! The probe is never run concurrently with itself: each attempt settles
//! before the next wait is scheduled. Elapsed time is accumulated in whole
//! intervals, so with a 400 ms timeout and a 200 ms interval the probe runs at
//! roughly 0, 200 and 400 ms and the poll fails right after the third attempt.
//! Intervals shorter than [`MIN_POLL_INTERVAL`] are raised to it, so the budget
//! always runs out.

use std::future::Future;
use std::time::Duration;

use naxios_core::{PollError, PollingError, DEFAULT_FETCHING_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};
use tokio::time::sleep;
use tracing::trace;

/// Smallest wait between attempts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing for [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Budget after which polling fails with [`PollingError::Timeout`].
    pub timeout: Duration,
    /// Wait between attempts.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_FETCHING_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The wait actually used between attempts, never below [`MIN_POLL_INTERVAL`].
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }
}

/// Run `probe` until `predicate` accepts its result or the timeout elapses.
///
/// A probe error ends polling immediately with [`PollError::Probe`].
pub async fn poll_until<T, E, P, Fut, C>(
    probe: P,
    predicate: C,
    config: &PollConfig,
) -> Result<T, PollError<E>>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&T) -> bool,
{
    poll_until_cancelled(probe, predicate, config, std::future::pending::<()>()).await
}

/// Like [`poll_until`], but stops with [`PollingError::Cancelled`] as soon as
/// `cancel` completes, including while a probe is in flight.
pub async fn poll_until_cancelled<T, E, P, Fut, C, X>(
    mut probe: P,
    mut predicate: C,
    config: &PollConfig,
    cancel: X,
) -> Result<T, PollError<E>>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&T) -> bool,
    X: Future<Output = ()>,
{
    tokio::pin!(cancel);
    let interval = config.effective_interval();
    let mut elapsed = Duration::ZERO;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = &mut cancel => return Err(PollingError::Cancelled.into()),
            result = probe() => result.map_err(PollError::Probe)?,
        };

        if predicate(&result) {
            trace!(attempt, "Poll condition met");
            return Ok(result);
        }

        if elapsed >= config.timeout {
            trace!(attempt, elapsed_ms = elapsed.as_millis() as u64, "Poll timed out");
            return Err(PollingError::Timeout { elapsed }.into());
        }

        elapsed += interval;
        tokio::select! {
            biased;
            _ = &mut cancel => return Err(PollingError::Cancelled.into()),
            _ = sleep(interval) => {}
        }
    }
}
