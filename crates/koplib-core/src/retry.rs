//! Retry logic with exponential backoff and jitter.
//!
//! Used for the two operations that may block: reading an existing library
//! held open by another process, and replacing the destination file. Both
//! budgets are bounded; exhaustion surfaces to the caller, never a hang.

use rand::Rng;
use std::time::Duration;

use crate::config::ContentionConfig;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Exponential base (typically 2.0 for doubling).
    pub exponential_base: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Budget for reading a library another process may hold open.
    pub fn for_reads() -> Self {
        Self {
            max_attempts: ContentionConfig::READ_MAX_ATTEMPTS,
            base_delay: ContentionConfig::READ_BASE_DELAY,
            max_delay: ContentionConfig::READ_MAX_DELAY,
            exponential_base: 2.0,
            jitter: true,
        }
    }

    /// Budget for replacing a destination another process may hold open.
    ///
    /// The cap equals the base delay, so attempts are evenly spaced and the
    /// whole budget stays on the order of several seconds.
    pub fn for_replace() -> Self {
        Self {
            max_attempts: ContentionConfig::REPLACE_MAX_ATTEMPTS,
            base_delay: ContentionConfig::REPLACE_BASE_DELAY,
            max_delay: ContentionConfig::REPLACE_MAX_DELAY,
            exponential_base: 2.0,
            jitter: true,
        }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff: base * (exponential_base ^ attempt)
        let multiplier = self.exponential_base.powi(attempt as i32);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // Multiply by a random factor between 0.5 and 1.5: same average
            // delay, but concurrent publishers stop waking in lockstep
            let mut rng = rand::rng();
            let jitter_factor = rng.random_range(0.5..1.5);
            (capped_secs * jitter_factor).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Retry a blocking operation with exponential backoff.
///
/// `should_retry` decides whether an error is transient; non-transient
/// errors return immediately after the first attempt.
///
/// Returns a tuple of (Result, RetryStats).
pub fn retry_blocking<F, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (std::result::Result<T, E>, RetryStats)
where
    F: FnMut() -> std::result::Result<T, E>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();

    for attempt in 0..config.max_attempts {
        stats.attempts = attempt + 1;

        match operation() {
            Ok(value) => {
                stats.success = true;
                if attempt > 0 {
                    tracing::debug!("Operation succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());

                if !should_retry(&e) {
                    tracing::debug!("Error is not retryable: {}", e);
                    return (Err(e), stats);
                }

                if attempt + 1 >= config.max_attempts {
                    tracing::warn!(
                        "All {} retry attempts exhausted. Last error: {}",
                        config.max_attempts,
                        e
                    );
                    return (Err(e), stats);
                }

                let delay = config.calculate_delay(attempt);
                stats.total_delay += delay;

                tracing::debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    config.max_attempts,
                    e,
                    delay
                );

                std::thread::sleep(delay);
            }
        }
    }

    unreachable!("Retry loop should have returned")
}
