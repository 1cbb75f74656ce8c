//! Retry loops for link establishment

use log::warn;
use std::time::Duration;

/// How often and how long to retry establishing a link
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (None = unlimited)
    pub max_attempts: Option<u32>,
    /// Delays used for the first failures, in order
    pub backoff: Vec<Duration>,
    /// Delay to use after the backoff pattern is exhausted
    pub sustained: Duration,
}

impl RetryPolicy {
    /// Unlimited attempts with the same delay after every failure
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff: Vec::new(),
            sustained: delay,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        self.backoff.get(index).copied().unwrap_or(self.sustained)
    }

    /// True when another attempt is allowed after `attempts` failures
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// Outcome of one failed attempt
#[derive(Debug)]
pub enum Attempt<E> {
    /// Worth trying again after the policy delay
    Retry(E),
    /// Give up immediately
    Abort(E),
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::fmt::Debug> {
    #[error("gave up after {attempts} attempts: {last:?}")]
    Exhausted { attempts: u32, last: E },
    #[error("unrecoverable error: {0:?}")]
    Fatal(E),
}

impl<E: std::fmt::Debug> RetryError<E> {
    /// Exhaustion may clear up later; fatal errors will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Run `op` until it succeeds, aborts, or the policy runs out of attempts.
///
/// `op` receives the 1-based attempt number. Blocks the caller for the
/// policy delay between attempts.
pub fn retry<T, E, F>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Debug,
    F: FnMut(u32) -> Result<T, Attempt<E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(Attempt::Abort(e)) => return Err(RetryError::Fatal(e)),
            Err(Attempt::Retry(e)) => {
                if !policy.allows(attempt) {
                    return Err(RetryError::Exhausted { attempts: attempt, last: e });
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}): {:?}, retrying in {:?}",
                    what, attempt, e, delay
                );
                std::thread::sleep(delay);
            }
        }
    }
}
