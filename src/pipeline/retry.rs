// src/pipeline/retry.rs

//! Retry ladder around a single fetch.
//!
//! Temporary bans are retried after increasing sleeps taken from a fixed
//! ladder. Account bans end the fetch immediately. Any other error is
//! returned as-is without retrying.

use std::time::Duration;

use tokio::time::sleep;

use crate::error::{AppError, Result};
use crate::models::{PostSample, RetryConfig};
use crate::services::{FetchRequest, PostFetcher, collect_sample};

/// Result of a fetch after the retry ladder has run.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Sample capped at the configured size
    Success(PostSample),
    /// Still temporarily banned after every attempt
    TransientFailure { attempts: u32, error: AppError },
    /// Account disabled, no retry attempted
    PermanentFailure { error: AppError },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Progress through the ladder within one fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Current attempt, starting at 1
    pub attempt: u32,
    /// Total backoff slept so far
    pub backoff_applied: Duration,
}

/// Bounded attempts with a strictly increasing backoff ladder.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    ladder: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.ladder())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, ladder: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ladder,
        }
    }

    /// Sleep taken after failed attempt `attempt`, or `None` when it was the last one.
    ///
    /// A ladder shorter than the attempt count repeats its final step.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let index = attempt.saturating_sub(1) as usize;
        self.ladder
            .get(index)
            .or_else(|| self.ladder.last())
            .copied()
            .or(Some(Duration::ZERO))
    }

    /// Fetch a sample, retrying temporary bans along the ladder.
    pub async fn fetch(
        &self,
        fetcher: &dyn PostFetcher,
        request: &FetchRequest,
    ) -> Result<FetchOutcome> {
        let mut state = RetryState {
            attempt: 1,
            backoff_applied: Duration::ZERO,
        };

        loop {
            log::debug!(
                "Fetching {} (attempt {}/{})",
                request.target,
                state.attempt,
                self.max_attempts
            );

            let error = match collect_sample(fetcher, request).await {
                Ok(sample) => {
                    log::info!("Obtained {} posts from {}", sample.len(), request.target);
                    return Ok(FetchOutcome::Success(sample));
                }
                Err(e) if e.is_permanent_ban() => {
                    log::error!("Account disabled while fetching {}: {}", request.target, e);
                    return Ok(FetchOutcome::PermanentFailure { error: e });
                }
                Err(e) if e.is_transient_ban() => e,
                Err(e) => return Err(e),
            };

            let Some(backoff) = self.backoff_after(state.attempt) else {
                log::error!(
                    "Still banned after {} attempts ({}s of backoff): {}",
                    state.attempt,
                    state.backoff_applied.as_secs(),
                    error
                );
                return Ok(FetchOutcome::TransientFailure {
                    attempts: state.attempt,
                    error,
                });
            };

            log::warn!(
                "Temporarily banned on attempt {}, sleeping {}s: {}",
                state.attempt,
                backoff.as_secs(),
                error
            );
            sleep(backoff).await;
            state.attempt += 1;
            state.backoff_applied += backoff;
            log::debug!("Backoff so far: {}s", state.backoff_applied.as_secs());
        }
    }
}
