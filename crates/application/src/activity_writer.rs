//! Asynchronous, best-effort activity log writer.
//!
//! Request handlers hand events to an [`ActivityQueue`] and return
//! immediately. A single background task drains the queue into the log
//! store, retrying transient failures with exponential backoff and
//! reporting events it gives up on to a [`WriterDiagnostics`] sink. A
//! single consumer over a FIFO queue keeps each producer's events in
//! enqueue order.

use std::sync::Arc;
use std::time::Duration;

use contractdesk_core::{AppError, AppResult};
use contractdesk_domain::ActivityEvent;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::activity_ports::{ActivityEventRepository, WriterDiagnostics};

mod config;
mod consumer;
mod queue;


pub use config::ActivityWriterConfig;
pub use queue::{ActivityQueue, WriterStats};

use consumer::WriterConsumer;
use queue::WriterCounters;

/// Outcome of stopping the activity writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterShutdownReport {
    /// Whether the queue was fully drained before the timeout.
    pub drained: bool,
    /// Events persisted over the writer's lifetime.
    pub persisted: u64,
    /// Events dropped after failed persistence.
    pub dropped: u64,
    /// Events left in the queue when the writer stopped.
    pub abandoned: u64,
}

/// Background writer owning the activity queue and its consumer task.
///
/// Built once by the process lifecycle, started at startup and stopped at
/// shutdown. Producers only ever see cloned [`ActivityQueue`] handles.
pub struct ActivityLogWriter {
    queue: ActivityQueue,
    receiver: Option<mpsc::Receiver<ActivityEvent>>,
    repository: Arc<dyn ActivityEventRepository>,
    diagnostics: Arc<dyn WriterDiagnostics>,
    config: ActivityWriterConfig,
    counters: Arc<WriterCounters>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ActivityLogWriter {
    /// Creates a stopped writer with an empty queue.
    pub fn new(
        repository: Arc<dyn ActivityEventRepository>,
        diagnostics: Arc<dyn WriterDiagnostics>,
        config: ActivityWriterConfig,
    ) -> AppResult<Self> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let counters = Arc::new(WriterCounters::default());
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            queue: ActivityQueue::new(sender, counters.clone(), diagnostics.clone()),
            receiver: Some(receiver),
            repository,
            diagnostics,
            config,
            counters,
            shutdown,
            task: None,
        })
    }

    /// Returns a producer handle for request handlers.
    #[must_use]
    pub fn queue(&self) -> ActivityQueue {
        self.queue.clone()
    }

    /// Returns current writer counters.
    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.counters.snapshot()
    }

    /// Returns whether the consumer task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawns the consumer task on the current tokio runtime.
    pub fn start(&mut self) -> AppResult<()> {
        let Some(receiver) = self.receiver.take() else {
            return Err(AppError::Conflict(
                "activity writer has already been started".to_owned(),
            ));
        };

        let consumer = WriterConsumer {
            receiver,
            repository: self.repository.clone(),
            diagnostics: self.diagnostics.clone(),
            config: self.config.clone(),
            counters: self.counters.clone(),
            shutdown: self.shutdown.subscribe(),
        };
        self.task = Some(tokio::spawn(consumer.run()));

        info!(
            queue_capacity = self.config.queue_capacity,
            max_attempts = self.config.max_attempts,
            "activity writer started"
        );

        Ok(())
    }

    /// Signals shutdown and waits up to `timeout` for queued events to drain.
    ///
    /// Events still queued when the timeout expires are abandoned.
    pub async fn stop(&mut self, timeout: Duration) -> WriterShutdownReport {
        self.shutdown.send_replace(true);

        let drained = match self.task.take() {
            Some(mut task) => match tokio::time::timeout(timeout, &mut task).await {
                Ok(Ok(())) => true,
                Ok(Err(join_error)) => {
                    error!(error = %join_error, "activity writer task failed");
                    false
                }
                Err(_) => {
                    task.abort();
                    warn!(
                        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "activity writer did not drain before timeout"
                    );
                    false
                }
            },
            None => {
                if let Some(receiver) = self.receiver.as_mut() {
                    receiver.close();
                }
                false
            }
        };

        let stats = self.stats();
        let report = WriterShutdownReport {
            drained: drained && stats.pending == 0,
            persisted: stats.persisted,
            dropped: stats.dropped,
            abandoned: stats.pending,
        };

        info!(
            drained = report.drained,
            persisted = report.persisted,
            dropped = report.dropped,
            abandoned = report.abandoned,
            "activity writer stopped"
        );

        report
    }
}
