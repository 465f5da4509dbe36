use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use contractdesk_domain::ActivityEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::activity_ports::{QueueRejection, WriterDiagnostics};

#[derive(Debug, Default)]
pub(super) struct WriterCounters {
    pub(super) enqueued: AtomicU64,
    pub(super) rejected: AtomicU64,
    pub(super) persisted: AtomicU64,
    pub(super) dropped: AtomicU64,
    pub(super) retried: AtomicU64,
}

impl WriterCounters {
    pub(super) fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> WriterStats {
        let enqueued = self.enqueued.load(Ordering::Relaxed);
        let persisted = self.persisted.load(Ordering::Relaxed);
        let dropped = self.dropped.load(Ordering::Relaxed);

        WriterStats {
            enqueued,
            rejected: self.rejected.load(Ordering::Relaxed),
            persisted,
            dropped,
            retried: self.retried.load(Ordering::Relaxed),
            pending: enqueued.saturating_sub(persisted.saturating_add(dropped)),
        }
    }
}

/// Point-in-time counters of the activity writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Events accepted into the queue.
    pub enqueued: u64,
    /// Events refused because the queue was full or closed.
    pub rejected: u64,
    /// Events written to the log store.
    pub persisted: u64,
    /// Enqueued events given up on after failed persistence.
    pub dropped: u64,
    /// Persistence attempts that were retried.
    pub retried: u64,
    /// Enqueued events not yet persisted or dropped.
    pub pending: u64,
}

/// Producer handle for the activity writer queue.
///
/// Cloning is cheap; every request handler can hold its own copy.
#[derive(Clone)]
pub struct ActivityQueue {
    sender: mpsc::Sender<ActivityEvent>,
    counters: Arc<WriterCounters>,
    diagnostics: Arc<dyn WriterDiagnostics>,
}

impl ActivityQueue {
    pub(super) fn new(
        sender: mpsc::Sender<ActivityEvent>,
        counters: Arc<WriterCounters>,
        diagnostics: Arc<dyn WriterDiagnostics>,
    ) -> Self {
        Self {
            sender,
            counters,
            diagnostics,
        }
    }

    /// Hands an event to the background writer without waiting.
    ///
    /// Never fails: when the queue is full or the writer has stopped, the
    /// event is dropped and reported to the diagnostics sink.
    pub fn enqueue(&self, event: ActivityEvent) {
        match self.sender.try_send(event) {
            Ok(()) => WriterCounters::increment(&self.counters.enqueued),
            Err(TrySendError::Full(event)) => self.reject(&event, QueueRejection::Full),
            Err(TrySendError::Closed(event)) => self.reject(&event, QueueRejection::Closed),
        }
    }

    /// Returns current writer counters.
    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.counters.snapshot()
    }

    fn reject(&self, event: &ActivityEvent, reason: QueueRejection) {
        WriterCounters::increment(&self.counters.rejected);
        self.diagnostics.event_rejected(event, reason);
    }
}
