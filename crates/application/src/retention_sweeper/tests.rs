use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use contractdesk_core::{AppError, AppResult};
use contractdesk_domain::{ResourceType, RetentionWindow};
use tokio::sync::Mutex;

use crate::activity_ports::{
    ActivityLogEntry, ActivityLogQuery, ActivityLogRepository, ActivitySummaryQuery,
    FieldHistoryEntry, ViewedResource,
};
use crate::retention_ports::{PurgedRecord, SoftDeleteCounts, SoftDeleteRetentionRepository};

use super::{MAX_SWEEP_INTERVAL, RetentionSweeper, RetentionSweeperConfig, SweepTarget};

#[derive(Default)]
struct FakeActivityLog {
    occurred_at: Mutex<Vec<DateTime<Utc>>>,
    field_changes_at: Mutex<Vec<DateTime<Utc>>>,
    unavailable: bool,
    purge_calls: AtomicU32,
}

#[async_trait]
impl ActivityLogRepository for FakeActivityLog {
    async fn list_recent_entries(
        &self,
        _query: ActivityLogQuery,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        Ok(Vec::new())
    }

    async fn summarize_entries(
        &self,
        _query: ActivitySummaryQuery,
    ) -> AppResult<BTreeMap<String, u64>> {
        Ok(BTreeMap::new())
    }

    async fn most_viewed_resources(
        &self,
        _resource_type: ResourceType,
        _since: DateTime<Utc>,
        _limit: usize,
    ) -> AppResult<Vec<ViewedResource>> {
        Ok(Vec::new())
    }

    async fn list_field_history(
        &self,
        _resource_type: ResourceType,
        _resource_id: i64,
        _limit: usize,
    ) -> AppResult<Vec<FieldHistoryEntry>> {
        Ok(Vec::new())
    }

    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let entries = self.occurred_at.lock().await;
        Ok(entries.iter().filter(|occurred_at| **occurred_at < cutoff).count() as u64)
    }

    async fn purge_entries_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(AppError::Unavailable("log store is down".to_owned()));
        }

        let mut entries = self.occurred_at.lock().await;
        let mut deleted = 0_u64;
        entries.retain(|occurred_at| {
            if *occurred_at < cutoff && deleted < u64::from(batch_size) {
                deleted += 1;
                false
            } else {
                true
            }
        });

        Ok(deleted)
    }

    async fn count_field_changes_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let changes = self.field_changes_at.lock().await;
        Ok(changes.iter().filter(|occurred_at| **occurred_at < cutoff).count() as u64)
    }

    async fn purge_field_changes_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64> {
        let mut changes = self.field_changes_at.lock().await;
        let mut deleted = 0_u64;
        changes.retain(|occurred_at| {
            if *occurred_at < cutoff && deleted < u64::from(batch_size) {
                deleted += 1;
                false
            } else {
                true
            }
        });

        Ok(deleted)
    }
}

#[derive(Default)]
struct FakeContracts {
    deleted: Mutex<Vec<PurgedRecord>>,
}

impl FakeContracts {
    fn with(records: Vec<PurgedRecord>) -> Self {
        Self {
            deleted: Mutex::new(records),
        }
    }

    async fn remaining_ids(&self) -> Vec<i64> {
        self.deleted
            .lock()
            .await
            .iter()
            .map(|record| record.record_id)
            .collect()
    }
}

#[async_trait]
impl SoftDeleteRetentionRepository for FakeContracts {
    async fn purge_soft_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<Vec<PurgedRecord>> {
        let mut records = self.deleted.lock().await;
        let limit = usize::try_from(batch_size).unwrap_or(usize::MAX);
        let mut purged = Vec::new();
        let mut kept = Vec::new();

        for record in records.drain(..) {
            if record.deleted_at < cutoff && purged.len() < limit {
                purged.push(record);
            } else {
                kept.push(record);
            }
        }
        *records = kept;

        Ok(purged)
    }

    async fn count_soft_deleted(&self, cutoff: DateTime<Utc>) -> AppResult<SoftDeleteCounts> {
        let records = self.deleted.lock().await;
        let ready_for_purge = records
            .iter()
            .filter(|record| record.deleted_at < cutoff)
            .count() as u64;

        Ok(SoftDeleteCounts {
            ready_for_purge,
            restorable: records.len() as u64 - ready_for_purge,
        })
    }
}

fn reference_now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).single() {
        Some(now) => now,
        None => panic!("valid timestamp rejected"),
    }
}

fn days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - chrono::Duration::days(days)
}

fn contract(record_id: i64, deleted_at: DateTime<Utc>) -> PurgedRecord {
    PurgedRecord {
        record_id,
        title: Some(format!("Contract {record_id}")),
        deleted_at,
    }
}

fn sweeper(
    activity_log: Arc<FakeActivityLog>,
    contracts: Arc<FakeContracts>,
    batch_size: u32,
) -> RetentionSweeper {
    let config = RetentionSweeperConfig {
        batch_size,
        ..RetentionSweeperConfig::default()
    };

    match RetentionSweeper::new(activity_log, contracts, config) {
        Ok(sweeper) => sweeper,
        Err(error) => panic!("valid sweeper config rejected: {error}"),
    }
}

#[tokio::test]
async fn sweep_purges_strictly_older_than_window() {
    let now = reference_now();
    let contracts = Arc::new(FakeContracts::with(vec![
        contract(31, days_ago(now, 31)),
        contract(30, days_ago(now, 30)),
        contract(29, days_ago(now, 29)),
    ]));
    let activity_log = Arc::new(FakeActivityLog::default());
    *activity_log.occurred_at.lock().await = vec![
        days_ago(now, 31),
        days_ago(now, 30),
        days_ago(now, 29),
    ];

    let sweeper = sweeper(activity_log.clone(), contracts.clone(), 500);
    let report = sweeper.sweep_at(now).await;

    assert!(!report.is_partial());
    assert_eq!(report.cutoff, days_ago(now, 30));
    assert_eq!(report.deleted_for(SweepTarget::SoftDeletedContracts), 1);
    assert_eq!(report.deleted_for(SweepTarget::ActivityLog), 1);
    assert_eq!(contracts.remaining_ids().await, vec![30, 29]);
    assert_eq!(activity_log.occurred_at.lock().await.len(), 2);
}

#[tokio::test]
async fn second_sweep_deletes_nothing() {
    let now = reference_now();
    let contracts = Arc::new(FakeContracts::with(
        (1..=7).map(|id| contract(id, days_ago(now, 40))).collect(),
    ));
    let activity_log = Arc::new(FakeActivityLog::default());
    *activity_log.occurred_at.lock().await = vec![days_ago(now, 45); 11];

    let sweeper = sweeper(activity_log, contracts, 500);

    let first = sweeper.sweep_at(now).await;
    let second = sweeper.sweep_at(now).await;

    assert_eq!(first.total_deleted(), 18);
    assert_eq!(second.total_deleted(), 0);
    assert!(!second.is_partial());
}

#[tokio::test]
async fn sweep_runs_in_batches_until_a_short_batch() {
    let now = reference_now();
    let activity_log = Arc::new(FakeActivityLog::default());
    *activity_log.occurred_at.lock().await = vec![days_ago(now, 60); 10];
    let contracts = Arc::new(FakeContracts::default());

    let sweeper = sweeper(activity_log.clone(), contracts, 4);
    let report = sweeper.sweep_at(now).await;

    let activity = report
        .targets
        .iter()
        .find(|target| target.target == SweepTarget::ActivityLog);
    assert_eq!(activity.map(|target| target.deleted), Some(10));
    assert_eq!(activity.map(|target| target.batches), Some(3));
    assert_eq!(activity_log.purge_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failing_target_does_not_stop_the_other_target() {
    let now = reference_now();
    let activity_log = Arc::new(FakeActivityLog {
        unavailable: true,
        ..FakeActivityLog::default()
    });
    let contracts = Arc::new(FakeContracts::with(vec![contract(5, days_ago(now, 90))]));

    let sweeper = sweeper(activity_log.clone(), contracts.clone(), 500);
    let report = sweeper.sweep_at(now).await;

    assert!(report.is_partial());
    assert_eq!(report.deleted_for(SweepTarget::SoftDeletedContracts), 1);
    assert!(contracts.remaining_ids().await.is_empty());
    assert_eq!(activity_log.purge_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn statistics_split_ready_and_restorable_records() {
    let now = reference_now();
    let contracts = Arc::new(FakeContracts::with(vec![
        contract(1, days_ago(now, 45)),
        contract(2, days_ago(now, 3)),
        contract(3, days_ago(now, 12)),
    ]));
    let activity_log = Arc::new(FakeActivityLog::default());
    *activity_log.occurred_at.lock().await = vec![days_ago(now, 31), days_ago(now, 1)];

    let sweeper = sweeper(activity_log, contracts, 500);
    let statistics = sweeper.statistics_at(now).await;

    let Ok(statistics) = statistics else {
        panic!("statistics should be available");
    };
    assert_eq!(statistics.window_days, 30);
    assert_eq!(statistics.activity_entries_ready, 1);
    assert_eq!(statistics.soft_deleted_ready, 1);
    assert_eq!(statistics.soft_deleted_restorable, 2);
    assert_eq!(statistics.field_history_window_days, 90);
    assert_eq!(statistics.field_changes_ready, 0);
}

#[tokio::test]
async fn field_history_is_kept_for_its_own_longer_window() {
    let now = reference_now();
    let activity_log = Arc::new(FakeActivityLog::default());
    *activity_log.occurred_at.lock().await = vec![days_ago(now, 45), days_ago(now, 91)];
    *activity_log.field_changes_at.lock().await =
        vec![days_ago(now, 45), days_ago(now, 90), days_ago(now, 91)];
    let contracts = Arc::new(FakeContracts::default());

    let sweeper = sweeper(activity_log.clone(), contracts, 500);

    let Ok(statistics) = sweeper.statistics_at(now).await else {
        panic!("statistics should be available");
    };
    assert_eq!(statistics.field_history_cutoff, days_ago(now, 90));
    assert_eq!(statistics.field_changes_ready, 1);

    let report = sweeper.sweep_at(now).await;

    assert!(!report.is_partial());
    assert_eq!(report.deleted_for(SweepTarget::ActivityLog), 2);
    assert_eq!(report.deleted_for(SweepTarget::FieldHistory), 1);
    let field_history = report
        .targets
        .iter()
        .find(|target| target.target == SweepTarget::FieldHistory);
    assert_eq!(field_history.map(|target| target.cutoff), Some(days_ago(now, 90)));
    assert_eq!(
        *activity_log.field_changes_at.lock().await,
        vec![days_ago(now, 45), days_ago(now, 90)]
    );
}

#[tokio::test(start_paused = true)]
async fn scheduler_sweeps_on_start_and_stops_cleanly() {
    let activity_log = Arc::new(FakeActivityLog::default());
    let contracts = Arc::new(FakeContracts::default());
    let config = RetentionSweeperConfig {
        run_on_start: true,
        interval: Duration::from_secs(60),
        ..RetentionSweeperConfig::default()
    };
    let sweeper = match RetentionSweeper::new(activity_log.clone(), contracts, config) {
        Ok(sweeper) => sweeper,
        Err(error) => panic!("valid sweeper config rejected: {error}"),
    };

    assert!(sweeper.start().is_ok());
    assert!(matches!(sweeper.start(), Err(AppError::Conflict(_))));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(activity_log.purge_calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(activity_log.purge_calls.load(Ordering::SeqCst), 2);

    assert!(sweeper.stop(Duration::from_secs(1)).await);
    assert!(!sweeper.is_running());
}

#[test]
fn zero_batch_size_is_rejected() {
    let config = RetentionSweeperConfig {
        batch_size: 0,
        window: RetentionWindow::default(),
        ..RetentionSweeperConfig::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn sweep_interval_above_one_year_is_rejected() {
    let activity_log = Arc::new(FakeActivityLog::default());
    let contracts = Arc::new(FakeContracts::default());
    let config = RetentionSweeperConfig {
        interval: Duration::from_secs(u64::MAX),
        ..RetentionSweeperConfig::default()
    };

    let created = RetentionSweeper::new(activity_log, contracts, config);

    assert!(matches!(created, Err(AppError::Validation(_))));
    let longest = RetentionSweeperConfig {
        interval: MAX_SWEEP_INTERVAL,
        ..RetentionSweeperConfig::default()
    };
    assert!(longest.validate().is_ok());
}

#[tokio::test(start_paused = true)]
async fn longest_interval_schedules_without_sweeping_early() {
    let activity_log = Arc::new(FakeActivityLog::default());
    let contracts = Arc::new(FakeContracts::default());
    let config = RetentionSweeperConfig {
        interval: MAX_SWEEP_INTERVAL,
        ..RetentionSweeperConfig::default()
    };
    let sweeper = match RetentionSweeper::new(activity_log.clone(), contracts, config) {
        Ok(sweeper) => sweeper,
        Err(error) => panic!("valid sweeper config rejected: {error}"),
    };

    assert!(sweeper.start().is_ok());
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(sweeper.is_running());
    assert_eq!(activity_log.purge_calls.load(Ordering::SeqCst), 0);
    assert!(sweeper.stop(Duration::from_secs(1)).await);
}
