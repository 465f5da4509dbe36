use serde::Serialize;
use ts_rs::TS;

/// Status of one backing dependency.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Activity writer counters exposed on the health endpoint.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/activity-writer-status.ts"
)]
pub struct ActivityWriterStatus {
    pub enqueued: u64,
    pub rejected: u64,
    pub persisted: u64,
    pub dropped: u64,
    pub retried: u64,
    pub pending: u64,
}

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub business_store: HealthDependencyStatus,
    pub log_store: HealthDependencyStatus,
    pub activity_writer: ActivityWriterStatus,
}

impl From<contractdesk_application::WriterStats> for ActivityWriterStatus {
    fn from(value: contractdesk_application::WriterStats) -> Self {
        Self {
            enqueued: value.enqueued,
            rejected: value.rejected,
            persisted: value.persisted,
            dropped: value.dropped,
            retried: value.retried,
            pending: value.pending,
        }
    }
}
