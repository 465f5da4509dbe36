use serde::Serialize;
use ts_rs::TS;

use super::format_timestamp;

/// Retention state relative to the current cutoff.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/retention-statistics-response.ts"
)]
pub struct RetentionStatisticsResponse {
    pub window_days: u16,
    pub cutoff: String,
    pub activity_entries_ready: u64,
    pub soft_deleted_ready: u64,
    pub soft_deleted_restorable: u64,
    pub field_history_window_days: u16,
    pub field_history_cutoff: String,
    pub field_changes_ready: u64,
}

/// Result of sweeping one target.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/sweep-target-response.ts"
)]
pub struct SweepTargetResponse {
    pub target: String,
    pub cutoff: String,
    pub deleted: u64,
    pub batches: u32,
    pub error: Option<String>,
}

/// Result of an on-demand sweep.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/sweep-report-response.ts"
)]
pub struct SweepReportResponse {
    pub swept_at: String,
    pub cutoff: String,
    pub total_deleted: u64,
    pub partial: bool,
    pub targets: Vec<SweepTargetResponse>,
}

impl From<contractdesk_application::RetentionStatistics> for RetentionStatisticsResponse {
    fn from(value: contractdesk_application::RetentionStatistics) -> Self {
        Self {
            window_days: value.window_days,
            cutoff: format_timestamp(value.cutoff),
            activity_entries_ready: value.activity_entries_ready,
            soft_deleted_ready: value.soft_deleted_ready,
            soft_deleted_restorable: value.soft_deleted_restorable,
            field_history_window_days: value.field_history_window_days,
            field_history_cutoff: format_timestamp(value.field_history_cutoff),
            field_changes_ready: value.field_changes_ready,
        }
    }
}

impl From<contractdesk_application::SweepReport> for SweepReportResponse {
    fn from(value: contractdesk_application::SweepReport) -> Self {
        Self {
            swept_at: format_timestamp(value.swept_at),
            cutoff: format_timestamp(value.cutoff),
            total_deleted: value.total_deleted(),
            partial: value.is_partial(),
            targets: value
                .targets
                .into_iter()
                .map(|target| SweepTargetResponse {
                    target: target.target.as_str().to_owned(),
                    cutoff: format_timestamp(target.cutoff),
                    deleted: target.deleted,
                    batches: target.batches,
                    error: target.error,
                })
                .collect(),
        }
    }
}
