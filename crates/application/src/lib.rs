//! Application services and ports.

#![forbid(unsafe_code)]

mod activity_ports;
mod activity_query_service;
mod activity_recorder;
mod activity_writer;
mod retention_ports;
mod retention_sweeper;

pub use activity_ports::{
    ActivityEventRepository, ActivityGroupBy, ActivityLogEntry, ActivityLogQuery,
    ActivityLogRepository, ActivitySummaryQuery, FieldHistoryEntry, QueueRejection,
    TracingWriterDiagnostics, ViewedResource, WriterDiagnostics,
};
pub use activity_query_service::{
    ActivityDashboard, ActivityFeedItem, ActivityQueryService, ActorActivity,
};
pub use activity_recorder::{ActivityRecorder, RequestActivityContext, ResourceRef};
pub use activity_writer::{
    ActivityLogWriter, ActivityQueue, ActivityWriterConfig, WriterShutdownReport, WriterStats,
};
pub use retention_ports::{PurgedRecord, SoftDeleteCounts, SoftDeleteRetentionRepository};
pub use retention_sweeper::{
    MAX_SWEEP_INTERVAL, RetentionStatistics, RetentionSweeper, RetentionSweeperConfig,
    SweepReport, SweepTarget, SweepTargetReport,
};
