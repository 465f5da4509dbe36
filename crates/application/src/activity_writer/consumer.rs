use std::sync::Arc;

use contractdesk_domain::ActivityEvent;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::activity_ports::{ActivityEventRepository, WriterDiagnostics};

use super::config::ActivityWriterConfig;
use super::queue::WriterCounters;

/// Single consumer draining the activity queue into the log store.
///
/// Holds only the store handle, diagnostics sink and config it was built
/// with, never request-scoped state.
pub(super) struct WriterConsumer {
    pub(super) receiver: mpsc::Receiver<ActivityEvent>,
    pub(super) repository: Arc<dyn ActivityEventRepository>,
    pub(super) diagnostics: Arc<dyn WriterDiagnostics>,
    pub(super) config: ActivityWriterConfig,
    pub(super) counters: Arc<WriterCounters>,
    pub(super) shutdown: watch::Receiver<bool>,
}

impl WriterConsumer {
    pub(super) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                next = self.receiver.recv() => match next {
                    Some(event) => self.persist(event).await,
                    None => {
                        info!("activity queue closed, writer exiting");
                        return;
                    }
                },
            }
        }

        self.drain().await;
    }

    async fn drain(&mut self) {
        self.receiver.close();

        let mut drained = 0_u64;
        while let Some(event) = self.receiver.recv().await {
            self.persist(event).await;
            drained = drained.saturating_add(1);
        }

        info!(drained, "activity writer drained queue");
    }

    async fn persist(&self, event: ActivityEvent) {
        let mut attempt = 1_u32;

        loop {
            match self.repository.append_event(&event).await {
                Ok(entry_id) => {
                    WriterCounters::increment(&self.counters.persisted);
                    debug!(
                        entry_id,
                        event_action = event.action().as_str(),
                        resource_type = event.resource_type().as_str(),
                        "activity event persisted"
                    );
                    return;
                }
                Err(error) if error.is_retryable() && attempt < self.config.max_attempts => {
                    WriterCounters::increment(&self.counters.retried);
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "failed to persist activity event, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => {
                    WriterCounters::increment(&self.counters.dropped);
                    self.diagnostics.event_dropped(&event, attempt, &error);
                    return;
                }
            }
        }
    }
}
