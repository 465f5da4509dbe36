mod diagnostics;
mod entries;
mod repositories;

pub use diagnostics::{QueueRejection, TracingWriterDiagnostics, WriterDiagnostics};
pub use entries::{
    ActivityGroupBy, ActivityLogEntry, ActivityLogQuery, ActivitySummaryQuery, FieldHistoryEntry,
    ViewedResource,
};
pub use repositories::{ActivityEventRepository, ActivityLogRepository};
