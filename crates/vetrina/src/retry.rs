//! Bounded retry with exponential backoff for transient store failures.
//!
//! Only [`Error::StoreUnavailable`](crate::error::Error::StoreUnavailable)
//! is retried — it is the one transient failure in the taxonomy.
//! `VersionConflict` is deliberately excluded: the caller must re-read
//! before trying again, which this helper cannot do for it. Exhausting the
//! retry budget surfaces the final error for that operation only; nothing
//! else in flight is affected.

use crate::error::Result;
use std::time::Duration;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (0 = no retries, fail immediately).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the backoff delay.
    pub max_delay: Duration,
    /// Backoff multiplier (2.0 = exponential doubling).
    pub multiplier: f64,
    /// Whether to add jitter to prevent synchronized retries.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A config with the given retry budget and default backoff shape.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::with_retries(0)
    }

    /// Backoff delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // Deterministic jitter keyed on the attempt number — enough to
            // de-synchronize callers without pulling in rand.
            let jitter_factor = match attempt % 4 {
                0 => 0.75,
                1 => 0.90,
                2 => 0.60,
                _ => 0.85,
            };
            Duration::from_secs_f64(capped * jitter_factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// Run a store operation, retrying transient failures with backoff.
///
/// # Example
///
/// ```ignore
/// let preset = with_store_retries(&RetryConfig::with_retries(3), || {
///     store.get("restaurant-v1")
/// })?;
/// ```
pub fn with_store_retries<T>(config: &RetryConfig, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "transient store failure (attempt {}/{}), retrying in {delay:?}: {e}",
                    attempt + 1,
                    config.max_retries
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
