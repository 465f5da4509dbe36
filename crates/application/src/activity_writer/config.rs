use std::time::Duration;

use contractdesk_core::{AppError, AppResult};

/// Tuning for the background activity writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityWriterConfig {
    /// Maximum number of events buffered between producers and the writer.
    pub queue_capacity: usize,
    /// Persistence attempts per event, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the exponential retry delay.
    pub max_backoff: Duration,
}

impl Default for ActivityWriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl ActivityWriterConfig {
    /// Validates capacity and retry settings.
    pub fn validate(&self) -> AppResult<()> {
        if self.queue_capacity == 0 {
            return Err(AppError::Validation(
                "activity queue capacity must be greater than zero".to_owned(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(AppError::Validation(
                "activity writer max_attempts must be greater than zero".to_owned(),
            ));
        }

        if self.max_backoff < self.initial_backoff {
            return Err(AppError::Validation(
                "activity writer max_backoff must not be lower than initial_backoff".to_owned(),
            ));
        }

        Ok(())
    }

    /// Returns the delay after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(exponent))
            .min(self.max_backoff)
    }
}
