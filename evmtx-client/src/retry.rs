//! Bounded sleep-and-retry.
//!
//! Every wait loop in this crate (receipt polling, transport retries) runs
//! through one policy: a fixed interval, a maximum attempt count, and a
//! cancellation token with an optional deadline. Cancelling a wait abandons
//! the wait only; whatever was started on the network stays started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative cancellation handle.
///
/// Clones share the same flag; any clone can cancel. A deadline, when set,
/// cancels the wait without any explicit call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that trips once `deadline` passes.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self { flag: Arc::default(), deadline: Some(deadline) }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// The outcome of one attempt inside [`RetryPolicy::run`].
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The awaited outcome arrived.
    Ready(T),
    /// Nothing yet; try again after the interval.
    Pending,
    /// Terminal failure; stop immediately.
    Fatal(E),
}

/// Why a bounded wait ended without its outcome.
#[derive(Debug)]
pub enum WaitError<E> {
    /// The attempt budget ran out. Not necessarily fatal: the awaited
    /// event may still happen after the caller stopped looking.
    TimedOut { attempts: u32 },
    /// The token was cancelled or its deadline passed.
    Cancelled,
    Fatal(E),
}

/// A fixed-interval, bounded-attempt wait policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Drives `op` until it is ready, fails terminally, the budget runs
    /// out, or the token cancels. The attempt counter passed to `op` starts
    /// at 1. Sleeps `interval` between attempts, not after the last.
    pub fn run<T, E>(
        &self,
        cancel: &CancelToken,
        mut op: impl FnMut(u32) -> Attempt<T, E>,
    ) -> Result<T, WaitError<E>> {
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled);
            }
            match op(attempt) {
                Attempt::Ready(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(WaitError::Fatal(err)),
                Attempt::Pending => {}
            }
            if attempt < self.max_attempts {
                thread::sleep(self.interval);
            }
        }
        Err(WaitError::TimedOut { attempts: self.max_attempts })
    }

    /// Retries a fallible operation while `retryable` classifies its error
    /// as transient. The first terminal error, or the last error once the
    /// budget is spent, is returned as-is. `op` always runs at least once.
    pub fn retry<T, E>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, E>,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    thread::sleep(self.interval);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
