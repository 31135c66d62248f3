//! Bounded retry with a fixed delay between attempts
//!
//! Every remote call the sync engine makes goes through [`RetryPolicy::run`]:
//! apply operations with the `apply` settings and the list fetch with the
//! `api` settings.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ApiConfig, ApplyConfig};

/// Default number of attempts, first try included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default pause between two attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2500);

/// All attempts failed
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Attempt count and delay for one kind of remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// A policy never makes fewer than one attempt
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy for create/update/delete calls
    pub fn for_apply(config: &ApplyConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Policy for fetching a list's remote contacts
    pub fn for_fetch(config: &ApiConfig) -> Self {
        Self::new(
            config.fetch_attempts,
            Duration::from_millis(config.fetch_retry_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds or the attempts are used up
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Result<T, Exhausted<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        attempts = attempt,
                        error = %err,
                        "Max attempts exhausted"
                    );
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                Err(err) => {
                    debug!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay.as_millis(),
                        error = %err,
                        "Retrying after failed attempt"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
