use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use contractdesk_core::AppResult;
use contractdesk_domain::{ActivityEvent, ResourceType};

use super::entries::{
    ActivityLogEntry, ActivityLogQuery, ActivitySummaryQuery, FieldHistoryEntry, ViewedResource,
};

/// Port for persisting append-only activity events.
#[async_trait]
pub trait ActivityEventRepository: Send + Sync {
    /// Persists one event with its field changes and returns the assigned entry id.
    async fn append_event(&self, event: &ActivityEvent) -> AppResult<i64>;
}

/// Repository port for reading and purging the activity log.
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Lists entries newest first.
    async fn list_recent_entries(
        &self,
        query: ActivityLogQuery,
    ) -> AppResult<Vec<ActivityLogEntry>>;

    /// Counts entries per bucket of the requested dimension.
    async fn summarize_entries(
        &self,
        query: ActivitySummaryQuery,
    ) -> AppResult<BTreeMap<String, u64>>;

    /// Returns the most viewed resources of one type since a point in time.
    async fn most_viewed_resources(
        &self,
        resource_type: ResourceType,
        since: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<ViewedResource>>;

    /// Lists field changes recorded for one resource, newest first.
    async fn list_field_history(
        &self,
        resource_type: ResourceType,
        resource_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FieldHistoryEntry>>;

    /// Counts entries that occurred strictly before the cutoff.
    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Deletes at most `batch_size` entries that occurred strictly before the cutoff.
    ///
    /// Each call is one transaction; callers repeat until fewer than
    /// `batch_size` rows come back.
    async fn purge_entries_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64>;

    /// Counts field changes recorded strictly before the cutoff.
    async fn count_field_changes_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Deletes at most `batch_size` field changes recorded strictly before the cutoff.
    ///
    /// Field changes are retained independently of their entry, so they
    /// remain in the history after the entry itself has been purged.
    async fn purge_field_changes_before(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: u32,
    ) -> AppResult<u64>;
}
