//! Background dispatch of violation events

use evidence::ViolationEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::ReportingSink;

/// Delivery counts for a dispatcher's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchStats {
    fn record(&mut self, result: Result<bool, JoinError>) {
        match result {
            Ok(true) => self.delivered += 1,
            Ok(false) => self.failed += 1,
            Err(e) => {
                warn!("Submission task aborted: {}", e);
                self.failed += 1;
            }
        }
    }
}

/// Hands events to a sink without blocking the caller.
///
/// Each event is submitted in its own task so a slow send never delays
/// the next one. Dropping the dispatcher lets submissions already queued
/// finish in the background.
pub struct Dispatcher {
    attempt_id: String,
    tx: mpsc::UnboundedSender<ViolationEvent>,
    task: JoinHandle<DispatchStats>,
}

impl Dispatcher {
    /// Start the dispatch task. Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn ReportingSink>, attempt_id: impl Into<String>) -> Self {
        let attempt_id = attempt_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        info!("Dispatching events for attempt {} to {}", attempt_id, sink.name());
        let task = tokio::spawn(run(sink, attempt_id.clone(), rx));
        Self {
            attempt_id,
            tx,
            task,
        }
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    /// Queue an event. Returns `false` if the dispatch task is gone.
    pub fn report(&self, event: ViolationEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("Dispatcher for attempt {} closed, event dropped", self.attempt_id);
                false
            }
        }
    }

    /// Stop accepting events and wait for queued submissions to finish
    pub async fn shutdown(self) -> DispatchStats {
        drop(self.tx);
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Dispatch task failed: {}", e);
                DispatchStats::default()
            }
        }
    }
}

async fn run(
    sink: Arc<dyn ReportingSink>,
    attempt_id: String,
    mut rx: mpsc::UnboundedReceiver<ViolationEvent>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(event) => {
                    in_flight.spawn(deliver(Arc::clone(&sink), attempt_id.clone(), event));
                }
                None => break,
            },
            Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                stats.record(result);
            }
        }
    }

    while let Some(result) = in_flight.join_next().await {
        stats.record(result);
    }

    debug!(
        "Dispatcher for attempt {} finished: {} delivered, {} failed",
        attempt_id, stats.delivered, stats.failed
    );
    stats
}

async fn deliver(sink: Arc<dyn ReportingSink>, attempt_id: String, event: ViolationEvent) -> bool {
    debug!("Sending {} event for attempt {}", event.event_type, attempt_id);
    match sink.submit(&attempt_id, &event).await {
        Ok(()) => {
            info!("{} event submitted for attempt {}", event.event_type, attempt_id);
            true
        }
        Err(e) => {
            warn!(
                "Failed to submit {} event for attempt {}: {}",
                event.event_type, attempt_id, e
            );
            false
        }
    }
}
