use std::time::Duration;

use contractdesk_core::{AppError, AppResult};
use contractdesk_domain::RetentionWindow;

/// Longest accepted time between scheduled sweeps.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Tuning for the retention sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionSweeperConfig {
    /// Age after which log entries and soft-deleted records are purged.
    pub window: RetentionWindow,
    /// Age after which recorded field changes are purged.
    pub field_history_window: RetentionWindow,
    /// Time between scheduled sweeps.
    pub interval: Duration,
    /// Maximum rows deleted per transaction.
    pub batch_size: u32,
    /// Whether the scheduler sweeps once immediately after starting.
    pub run_on_start: bool,
}

impl Default for RetentionSweeperConfig {
    fn default() -> Self {
        Self {
            window: RetentionWindow::default(),
            field_history_window: RetentionWindow::field_history_default(),
            interval: Duration::from_secs(24 * 60 * 60),
            batch_size: 500,
            run_on_start: false,
        }
    }
}

impl RetentionSweeperConfig {
    /// Validates interval and batch settings.
    pub fn validate(&self) -> AppResult<()> {
        if self.interval.is_zero() {
            return Err(AppError::Validation(
                "retention sweep interval must be greater than zero".to_owned(),
            ));
        }

        if self.interval > MAX_SWEEP_INTERVAL {
            return Err(AppError::Validation(format!(
                "retention sweep interval must not exceed {} seconds",
                MAX_SWEEP_INTERVAL.as_secs()
            )));
        }

        if self.batch_size == 0 {
            return Err(AppError::Validation(
                "retention sweep batch size must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}
