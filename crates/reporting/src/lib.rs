//! Violation Reporting
//!
//! Delivers violation events to an external reporting sink:
//! - Fire-and-forget dispatch off the frame-processing path
//! - At-most-once delivery, failures logged and never retried
//! - MQTT publishing to the assessment backend
//! - In-memory sink for replays and tests

mod dispatcher;
mod memory;
mod mqtt;

pub use dispatcher::{DispatchStats, Dispatcher};
pub use memory::{MemorySink, SubmittedEvent};
pub use mqtt::{MqttConfig, MqttSink};

use async_trait::async_trait;
use evidence::ViolationEvent;
use thiserror::Error;

/// Reporting error types
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Receives violation events for an assessment attempt
#[async_trait]
pub trait ReportingSink: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn submit(&self, attempt_id: &str, event: &ViolationEvent) -> Result<(), ReportError>;
}
