use async_trait::async_trait;
use chrono::{DateTime, Utc};

use contractdesk_core::AppResult;

/// Business record removed permanently by a retention sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgedRecord {
    /// Primary key of the removed record.
    pub record_id: i64,
    /// Title at the time of removal.
    pub title: Option<String>,
    /// Soft-delete timestamp of the removed record.
    pub deleted_at: DateTime<Utc>,
}

/// Soft-deleted record counts relative to a retention cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftDeleteCounts {
    /// Records deleted before the cutoff.
    pub ready_for_purge: u64,
    /// Records deleted at or after the cutoff, still restorable.
    pub restorable: u64,
}

/// Port over the business datastore's soft-delete markers.
///
/// The sweeper only reads and purges; it never restores or soft-deletes.
#[async_trait]
pub trait SoftDeleteRetentionRepository: Send + Sync {
    /// Permanently deletes at most `batch_size` records soft-deleted strictly
    /// before the cutoff, together with the sub-resources they own.
    async fn purge_soft_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<Vec<PurgedRecord>>;

    /// Counts soft-deleted records on each side of the cutoff.
    async fn count_soft_deleted(&self, cutoff: DateTime<Utc>) -> AppResult<SoftDeleteCounts>;
}
