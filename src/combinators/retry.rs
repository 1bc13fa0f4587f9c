use crate::fork::{CancelHandle, Settle};
use crate::task::Task;
use crate::time;

use std::time::Duration;

/// Delay schedule for [`Task::retry_with`].
///
/// The n-th retry (counting from zero) waits `base * factor^n`, optionally
/// capped at `max_delay`.
///
/// # Examples
///
/// ```rust
/// use forked::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff::new(Duration::from_millis(10)).retries(4);
///
/// assert_eq!(backoff.delay_for(0), Duration::from_millis(10));
/// assert_eq!(backoff.delay_for(3), Duration::from_millis(80));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    retries: usize,
    factor: u32,
    max_delay: Option<Duration>,
}

impl Backoff {
    /// Creates a schedule starting at `base`, doubling on every retry, with
    /// no retries configured yet.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            retries: 0,
            factor: 2,
            max_delay: None,
        }
    }

    /// Sets how many times a failed attempt is retried.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the growth factor between consecutive delays.
    ///
    /// A factor of zero is treated as one.
    pub fn factor(mut self, factor: u32) -> Self {
        self.factor = factor.max(1);
        self
    }

    /// Caps every delay at `max_delay`.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.retries
    }

    /// Delay before retry number `retry`, counting from zero.
    ///
    /// Saturates at [`Duration::MAX`].
    pub fn delay_for(&self, retry: usize) -> Duration {
        let multiplier = match self.factor {
            1 => Some(1),
            factor => u32::try_from(retry)
                .ok()
                .and_then(|exponent| u128::from(factor).checked_pow(exponent)),
        };

        let delay = multiplier
            .and_then(|multiplier| self.base.as_nanos().checked_mul(multiplier))
            .and_then(duration_from_nanos)
            .unwrap_or(if self.base.is_zero() { Duration::ZERO } else { Duration::MAX });

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

fn duration_from_nanos(nanos: u128) -> Option<Duration> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    let subsec = u32::try_from(nanos % NANOS_PER_SEC).ok()?;

    Some(Duration::new(secs, subsec))
}

impl<E: 'static, S: 'static> Task<E, S> {
    /// Forks this task once `delay` has elapsed.
    ///
    /// Cancelling before the delay elapses cancels the timer; afterwards it
    /// cancels the fork.
    pub fn wait(&self, delay: Duration) -> Task<E, S> {
        let task = self.clone();

        Task::new(move |settle: Settle<E, S>| {
            let task = task.clone();
            let timer = time::set_timeout(delay, move || {
                task.fork_into(&settle);
            });

            CancelHandle::from_fn(move || timer.cancel())
        })
    }

    /// On failure, tries again once after `delay`.
    pub fn retry_in(&self, delay: Duration) -> Task<E, S> {
        let task = self.clone();
        self.or_else(move |_| task.wait(delay))
    }

    /// Retries up to `times` times, waiting `base`, then `2 * base`,
    /// `4 * base` and so on between attempts.
    ///
    /// # Arguments
    ///
    /// * `base` - The delay before the first retry.
    /// * `times` - The maximum number of retries.
    ///
    /// # Returns
    ///
    /// A task which fails with the error of the last attempt once every
    /// retry has failed.
    pub fn retry_with_exponential_backoff(&self, base: Duration, times: usize) -> Task<E, S> {
        self.retry_with(Backoff::new(base).retries(times))
    }

    /// Retries on failure following `backoff`.
    pub fn retry_with(&self, backoff: Backoff) -> Task<E, S> {
        let task = self.clone();

        Task::new(move |settle: Settle<E, S>| {
            attempt(task.clone(), backoff, 0, settle);
            CancelHandle::noop()
        })
    }
}

/// Forks `task` into `settle`, scheduling the next attempt on failure.
///
/// Every attempt after the first runs from a timer callback, so the stack
/// does not grow with the number of retries.
fn attempt<E: 'static, S: 'static>(task: Task<E, S>, backoff: Backoff, retry: usize, settle: Settle<E, S>) {
    let on_error = {
        let (task, settle) = (task.clone(), settle.clone());

        move |error: E| {
            if retry >= backoff.max_retries() {
                tracing::debug!(attempts = retry + 1, "retries exhausted");
                settle.reject(error);
                return;
            }

            let delay = backoff.delay_for(retry);
            tracing::debug!(retry = retry + 1, ?delay, "attempt failed, retrying");

            let next = settle.clone();
            let timer = time::set_timeout(delay, move || attempt(task, backoff, retry + 1, next));
            settle.on_cancel(move || timer.cancel());
        }
    };

    let child = task.fork(on_error, settle.resolver());
    settle.link(child);
}
