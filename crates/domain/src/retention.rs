use chrono::{DateTime, Duration, Utc};
use contractdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default retention window for activity logs and soft-deleted records.
pub const DEFAULT_RETENTION_DAYS: u16 = 30;

/// Default retention window for recorded field changes.
pub const DEFAULT_FIELD_HISTORY_RETENTION_DAYS: u16 = 90;

/// Number of whole days after which rows become eligible for purge.
///
/// The boundary is exclusive: a row exactly `days` old is retained and
/// only rows strictly older than the window are purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetentionWindow {
    days: u16,
}

impl RetentionWindow {
    /// Creates a validated retention window.
    pub fn from_days(days: u16) -> AppResult<Self> {
        if days == 0 {
            return Err(AppError::Validation(
                "retention window must be at least one day".to_owned(),
            ));
        }

        Ok(Self { days })
    }

    /// Returns the default window for recorded field changes.
    #[must_use]
    pub fn field_history_default() -> Self {
        Self {
            days: DEFAULT_FIELD_HISTORY_RETENTION_DAYS,
        }
    }

    /// Returns the window length in days.
    #[must_use]
    pub fn days(&self) -> u16 {
        self.days
    }

    /// Returns the window as a duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::days(i64::from(self.days))
    }

    /// Returns the oldest timestamp that is still retained at `now`.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}
