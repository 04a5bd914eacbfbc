//! Violation events and their wire form

use attention::ViolationReason;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type understood by the assessment backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    LookingAway,
    MultipleFaces,
    FaceNotDetected,
}

impl EventType {
    /// Map an internal reason. `no_face` only maps when face absence is
    /// reported as a violation.
    pub fn for_reason(reason: ViolationReason, report_face_absence: bool) -> Option<Self> {
        match reason {
            ViolationReason::HeadYaw
            | ViolationReason::HeadPitch
            | ViolationReason::GazeDirection => Some(EventType::LookingAway),
            ViolationReason::MultipleFaces => Some(EventType::MultipleFaces),
            ViolationReason::NoFace if report_face_absence => Some(EventType::FaceNotDetected),
            ViolationReason::NoFace => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LookingAway => "LOOKING_AWAY",
            EventType::MultipleFaces => "MULTIPLE_FACES",
            EventType::FaceNotDetected => "FACE_NOT_DETECTED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmed, cooldown-cleared violation with its proof image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    /// `data:image/jpeg;base64,...`
    pub evidence_image: String,
    /// Capture time minus the start of the violation window
    pub duration_ms: u64,
    pub confidence: f32,
}

impl ViolationEvent {
    /// Backend payload for this event
    pub fn to_payload(&self) -> WebcamEventPayload {
        WebcamEventPayload {
            event_type: self.event_type,
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            image_data: self.evidence_image.clone(),
            details: EventDetails {
                duration: self.duration_ms,
                confidence: self.confidence,
            },
        }
    }
}

/// Webcam monitor event as submitted for an assessment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebcamEventPayload {
    pub event_type: EventType,
    /// ISO-8601, millisecond precision, UTC
    pub timestamp: String,
    pub image_data: String,
    pub details: EventDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Milliseconds
    pub duration: u64,
    pub confidence: f32,
}
