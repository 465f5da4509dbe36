use chrono::{DateTime, SecondsFormat, Utc};

mod activity;
mod common;
mod retention;

pub use activity::{
    ActivityDashboardResponse, ActivityFeedItemResponse, ActivityLogEntryResponse,
    ActivitySummaryResponse, FieldHistoryEntryResponse, ViewedResourceResponse,
};
pub use common::{ActivityWriterStatus, HealthDependencyStatus, HealthResponse};
pub use retention::{RetentionStatisticsResponse, SweepReportResponse};

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
