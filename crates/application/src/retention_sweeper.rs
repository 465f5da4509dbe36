//! Timer-driven retention sweeper.
//!
//! Each sweep deletes activity log entries and soft-deleted contracts older
//! than the retention window, and recorded field changes older than the
//! longer field history window. Work is chunked into short batches, each one
//! its own transaction in the store, so foreground traffic never waits on a
//! long-running delete. A failed batch ends that target for the current run;
//! the next scheduled run picks up where it stopped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use contractdesk_core::{AppError, AppResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::activity_ports::ActivityLogRepository;
use crate::retention_ports::SoftDeleteRetentionRepository;

mod config;
mod report;
mod scheduler;

#[cfg(test)]
mod tests;

pub use config::{MAX_SWEEP_INTERVAL, RetentionSweeperConfig};
pub use report::{RetentionStatistics, SweepReport, SweepTarget, SweepTargetReport};

/// Purges expired activity log entries and soft-deleted records.
///
/// Shared by the process lifecycle, which starts and stops the schedule,
/// and by the admin surface, which can trigger a sweep on demand.
pub struct RetentionSweeper {
    runner: Arc<SweepRunner>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct SweepRunner {
    activity_repository: Arc<dyn ActivityLogRepository>,
    soft_delete_repository: Arc<dyn SoftDeleteRetentionRepository>,
    config: RetentionSweeperConfig,
}

impl RetentionSweeper {
    /// Creates a sweeper with a stopped schedule.
    pub fn new(
        activity_repository: Arc<dyn ActivityLogRepository>,
        soft_delete_repository: Arc<dyn SoftDeleteRetentionRepository>,
        config: RetentionSweeperConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            runner: Arc::new(SweepRunner {
                activity_repository,
                soft_delete_repository,
                config,
            }),
            shutdown,
            task: Mutex::new(None),
        })
    }

    /// Runs one sweep against the current time.
    pub async fn sweep(&self) -> SweepReport {
        self.runner.sweep_at(Utc::now()).await
    }

    /// Runs one sweep against an explicit reference time.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        self.runner.sweep_at(now).await
    }

    /// Counts what a sweep at `now` would remove and what stays restorable.
    pub async fn statistics_at(&self, now: DateTime<Utc>) -> AppResult<RetentionStatistics> {
        let window = self.runner.config.window;
        let cutoff = window.cutoff(now);
        let field_history_window = self.runner.config.field_history_window;
        let field_history_cutoff = field_history_window.cutoff(now);
        let activity_entries_ready = self
            .runner
            .activity_repository
            .count_entries_before(cutoff)
            .await?;
        let soft_deleted = self
            .runner
            .soft_delete_repository
            .count_soft_deleted(cutoff)
            .await?;
        let field_changes_ready = self
            .runner
            .activity_repository
            .count_field_changes_before(field_history_cutoff)
            .await?;

        Ok(RetentionStatistics {
            cutoff,
            window_days: window.days(),
            activity_entries_ready,
            soft_deleted_ready: soft_deleted.ready_for_purge,
            soft_deleted_restorable: soft_deleted.restorable,
            field_history_cutoff,
            field_history_window_days: field_history_window.days(),
            field_changes_ready,
        })
    }

    /// Spawns the interval loop on the current tokio runtime.
    pub fn start(&self) -> AppResult<()> {
        let mut task = self.task.lock().map_err(|error| {
            AppError::Internal(format!("failed to lock retention sweeper task: {error}"))
        })?;

        if task.is_some() {
            return Err(AppError::Conflict(
                "retention sweeper has already been started".to_owned(),
            ));
        }

        *task = Some(tokio::spawn(scheduler::run_schedule(
            self.runner.clone(),
            self.shutdown.subscribe(),
        )));

        info!(
            window_days = self.runner.config.window.days(),
            field_history_window_days = self.runner.config.field_history_window.days(),
            interval_secs = self.runner.config.interval.as_secs(),
            batch_size = self.runner.config.batch_size,
            run_on_start = self.runner.config.run_on_start,
            "retention sweeper started"
        );

        Ok(())
    }

    /// Returns whether the interval loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Signals the loop to stop, letting an in-flight sweep finish within `timeout`.
    ///
    /// Returns `true` when the loop exited on its own.
    pub async fn stop(&self, timeout: Duration) -> bool {
        self.shutdown.send_replace(true);

        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(error) => {
                error!(error = %error, "failed to lock retention sweeper task");
                None
            }
        };

        let Some(mut handle) = handle else {
            return true;
        };

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => true,
            Ok(Err(join_error)) => {
                error!(error = %join_error, "retention sweeper task failed");
                false
            }
            Err(_) => {
                handle.abort();
                warn!("retention sweeper abandoned an in-flight sweep at shutdown");
                false
            }
        }
    }
}

impl SweepRunner {
    async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let cutoff = self.config.window.cutoff(now);
        let field_history_cutoff = self.config.field_history_window.cutoff(now);

        let targets = vec![
            self.sweep_activity_log(cutoff).await,
            self.sweep_soft_deleted_contracts(cutoff).await,
            self.sweep_field_history(field_history_cutoff).await,
        ];

        SweepReport {
            swept_at: now,
            cutoff,
            targets,
        }
    }

    async fn sweep_activity_log(&self, cutoff: DateTime<Utc>) -> SweepTargetReport {
        let mut report = SweepTargetReport::new(SweepTarget::ActivityLog, cutoff);
        let batch_size = self.config.batch_size;

        loop {
            match self
                .activity_repository
                .purge_entries_before(cutoff, batch_size)
                .await
            {
                Ok(deleted) => {
                    report.deleted = report.deleted.saturating_add(deleted);
                    report.batches = report.batches.saturating_add(1);
                    if deleted < u64::from(batch_size) {
                        break;
                    }
                }
                Err(error) => {
                    record_target_failure(&mut report, &error);
                    break;
                }
            }
        }

        report
    }

    async fn sweep_soft_deleted_contracts(&self, cutoff: DateTime<Utc>) -> SweepTargetReport {
        let mut report = SweepTargetReport::new(SweepTarget::SoftDeletedContracts, cutoff);
        let batch_size = self.config.batch_size;

        loop {
            match self
                .soft_delete_repository
                .purge_soft_deleted_before(cutoff, batch_size)
                .await
            {
                Ok(purged) => {
                    for record in &purged {
                        info!(
                            contract_id = record.record_id,
                            title = record.title.as_deref().unwrap_or(""),
                            deleted_at = %record.deleted_at,
                            "permanently deleted soft-deleted contract"
                        );
                    }

                    let deleted = u64::try_from(purged.len()).unwrap_or(u64::MAX);
                    report.deleted = report.deleted.saturating_add(deleted);
                    report.batches = report.batches.saturating_add(1);
                    if deleted < u64::from(batch_size) {
                        break;
                    }
                }
                Err(error) => {
                    record_target_failure(&mut report, &error);
                    break;
                }
            }
        }

        report
    }

    async fn sweep_field_history(&self, cutoff: DateTime<Utc>) -> SweepTargetReport {
        let mut report = SweepTargetReport::new(SweepTarget::FieldHistory, cutoff);
        let batch_size = self.config.batch_size;

        loop {
            match self
                .activity_repository
                .purge_field_changes_before(cutoff, batch_size)
                .await
            {
                Ok(deleted) => {
                    report.deleted = report.deleted.saturating_add(deleted);
                    report.batches = report.batches.saturating_add(1);
                    if deleted < u64::from(batch_size) {
                        break;
                    }
                }
                Err(error) => {
                    record_target_failure(&mut report, &error);
                    break;
                }
            }
        }

        report
    }
}

fn record_target_failure(report: &mut SweepTargetReport, error: &AppError) {
    warn!(
        target_name = report.target.as_str(),
        deleted_count = report.deleted,
        batches = report.batches,
        retryable = error.is_retryable(),
        error = %error,
        "retention sweep target failed, deferring to next run"
    );
    report.error = Some(error.to_string());
}
