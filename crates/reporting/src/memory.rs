//! In-memory reporting sink

use async_trait::async_trait;
use evidence::ViolationEvent;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::{ReportError, ReportingSink};

/// Event as received by the sink
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedEvent {
    pub attempt_id: String,
    pub event: ViolationEvent,
}

/// Keeps submitted events in memory (oldest dropped past capacity)
pub struct MemorySink {
    records: Mutex<VecDeque<SubmittedEvent>>,
    max_records: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_records: usize) -> Self {
        info!("Creating in-memory reporting sink (max {} events)", max_records);
        Self {
            records: Mutex::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    /// Events submitted for one attempt, oldest first
    pub fn events_for(&self, attempt_id: &str) -> Vec<ViolationEvent> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.attempt_id == attempt_id)
            .map(|r| r.event)
            .collect()
    }

    /// All stored events, oldest first
    pub fn snapshot(&self) -> Vec<SubmittedEvent> {
        match self.records.lock() {
            Ok(records) => records.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportingSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn submit(&self, attempt_id: &str, event: &ViolationEvent) -> Result<(), ReportError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| ReportError::Storage(format!("Lock error: {}", e)))?;

        // Enforce retention
        while records.len() >= self.max_records {
            records.pop_front();
        }

        records.push_back(SubmittedEvent {
            attempt_id: attempt_id.to_string(),
            event: event.clone(),
        });
        debug!("Stored {} event for attempt {}", event.event_type, attempt_id);
        Ok(())
    }
}
