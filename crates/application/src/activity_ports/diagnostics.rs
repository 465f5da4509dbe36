use contractdesk_core::AppError;
use contractdesk_domain::ActivityEvent;
use tracing::{error, warn};

/// Reason an event never reached the writer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRejection {
    /// The bounded queue was at capacity.
    Full,
    /// The writer has stopped consuming.
    Closed,
}

impl QueueRejection {
    /// Returns a stable label for diagnostics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "queue_full",
            Self::Closed => "writer_stopped",
        }
    }
}

/// Fallback channel for activity events the writer could not persist.
///
/// Implementations must not block and must not fail.
pub trait WriterDiagnostics: Send + Sync {
    /// Called when an event could not be enqueued.
    fn event_rejected(&self, event: &ActivityEvent, reason: QueueRejection);

    /// Called when an event is dropped after its final persistence attempt.
    fn event_dropped(&self, event: &ActivityEvent, attempts: u32, error: &AppError);
}

/// Diagnostics sink that reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWriterDiagnostics;

impl WriterDiagnostics for TracingWriterDiagnostics {
    fn event_rejected(&self, event: &ActivityEvent, reason: QueueRejection) {
        warn!(
            reason = reason.as_str(),
            event_action = event.action().as_str(),
            resource_type = event.resource_type().as_str(),
            resource_id = ?event.resource_id(),
            "activity event rejected by writer queue"
        );
    }

    fn event_dropped(&self, event: &ActivityEvent, attempts: u32, error: &AppError) {
        error!(
            attempts,
            error = %error,
            event_action = event.action().as_str(),
            resource_type = event.resource_type().as_str(),
            resource_id = ?event.resource_id(),
            actor_id = ?event.actor_id().map(|actor| actor.as_i64()),
            occurred_at = %event.occurred_at(),
            "dropping activity event after failed persistence"
        );
    }
}
