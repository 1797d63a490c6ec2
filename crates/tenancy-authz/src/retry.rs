//! Retry-on-conflict with exponential backoff.
//!
//! Units of work that lose a uniqueness race (for example two concurrent
//! invitations for the same email, or a token collision) are rerun from the
//! start in a fresh transaction. Every other error returns immediately.

use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Initial delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Base for exponential backoff (typically 2.0)
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::conflict()
    }
}

impl RetryConfig {
    /// Short delays suited to rerunning a transaction after a constraint conflict.
    ///
    /// Two attempts: the first try plus one retry.
    pub fn conflict() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(100),
            exponential_base: 2.0,
        }
    }

    /// A configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            exponential_base: 1.0,
        }
    }
}

/// Execute a function, retrying only errors accepted by `is_retryable`.
///
/// # Arguments
///
/// * `config` - Retry configuration
/// * `f` - Function to execute (must be `FnMut` and return a `Future`)
/// * `is_retryable` - Predicate to determine if an error is retryable
///
/// # Returns
///
/// The result of the function call, or the error if it's not retryable
/// or all attempts fail
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut f: F,
    mut is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) if attempt >= config.max_attempts => {
                tracing::warn!(
                    attempts = attempt,
                    error = ?e,
                    "All retry attempts exhausted"
                );
                return Err(e);
            }
            Err(e) => {
                tracing::debug!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "Conflict, retrying"
                );

                sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.exponential_base)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
