//! Evidence Gate
//!
//! Turns confirmed violations into reportable events: maps the reason to
//! an external event type, enforces a global cooldown, captures a proof
//! frame, and packages the event.

mod event;
mod gate;

pub use event::{EventDetails, EventType, ViolationEvent, WebcamEventPayload};
pub use gate::{CaptureOutcome, CooldownState, EvidenceGate, GateConfig, DEFAULT_COOLDOWN_MS};

use face_capture::CaptureError;
use thiserror::Error;

/// Evidence error types
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Frame capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Timestamp out of range: {0}ms")]
    Timestamp(u64),
}
