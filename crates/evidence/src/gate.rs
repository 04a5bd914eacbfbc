//! Cooldown gate and evidence capture

use attention::ViolationReason;
use chrono::{DateTime, Utc};
use face_capture::FrameSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{EventType, EvidenceError, ViolationEvent};

/// Default minimum interval between evidence submissions
pub const DEFAULT_COOLDOWN_MS: u64 = 10_000;

/// Confidence attached to every event until the classifier produces one
const PLACEHOLDER_CONFIDENCE: f32 = 1.0;

/// Gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum time between evidence submissions, shared by all violation types
    pub cooldown_ms: u64,
    /// Map `no_face` to `FACE_NOT_DETECTED` instead of dropping it
    pub report_face_absence: bool,
    /// JPEG quality of evidence images (1-100)
    pub jpeg_quality: u8,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            report_face_absence: false,
            jpeg_quality: 80,
        }
    }
}

/// When evidence was last sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    pub last_evidence_sent_at_ms: Option<u64>,
}

impl CooldownState {
    /// Time left before another submission is allowed, `None` if allowed now
    pub fn remaining_ms(&self, now_ms: u64, cooldown_ms: u64) -> Option<u64> {
        let last = self.last_evidence_sent_at_ms?;
        let elapsed = now_ms.saturating_sub(last);
        (elapsed < cooldown_ms).then(|| cooldown_ms - elapsed)
    }
}

/// What happened to a capture request
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Reason has no external event type; dropped
    Unmapped,
    /// Inside the cooldown window; nothing captured or sent
    CoolingDown { remaining_ms: u64 },
    /// Frame could not be captured or encoded; cooldown untouched
    CaptureFailed(EvidenceError),
    /// Event ready for delivery; cooldown already advanced
    Emitted(ViolationEvent),
}

impl CaptureOutcome {
    pub fn event(&self) -> Option<&ViolationEvent> {
        match self {
            CaptureOutcome::Emitted(event) => Some(event),
            _ => None,
        }
    }
}

/// Decides whether a confirmed violation becomes an event
pub struct EvidenceGate {
    config: GateConfig,
    cooldown: CooldownState,
    emitted: usize,
    suppressed: usize,
}

impl EvidenceGate {
    pub fn new(config: GateConfig) -> Self {
        info!("Creating evidence gate with config: {:?}", config);
        Self {
            config,
            cooldown: CooldownState::default(),
            emitted: 0,
            suppressed: 0,
        }
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Events emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Requests dropped by the cooldown
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Try to turn a confirmed violation into an event.
    ///
    /// The cooldown timestamp moves to `now_ms` as soon as the event is
    /// built, before delivery is attempted, and is never rolled back.
    pub fn try_capture(
        &mut self,
        reason: ViolationReason,
        started_at_ms: u64,
        now_ms: u64,
        frames: &dyn FrameSource,
    ) -> CaptureOutcome {
        let Some(event_type) = EventType::for_reason(reason, self.config.report_face_absence) else {
            warn!("No event type for violation reason {}, dropping", reason);
            return CaptureOutcome::Unmapped;
        };

        if let Some(remaining_ms) = self.cooldown.remaining_ms(now_ms, self.config.cooldown_ms) {
            debug!(
                "Cooldown active ({:.1}s remaining), skipping proof for {}",
                remaining_ms as f64 / 1000.0,
                reason
            );
            self.suppressed += 1;
            metrics::counter!("proctor_evidence_suppressed_total", "reason" => reason.as_str())
                .increment(1);
            return CaptureOutcome::CoolingDown { remaining_ms };
        }

        let event = match self.build_event(event_type, started_at_ms, now_ms, frames) {
            Ok(event) => event,
            Err(e) => {
                error!("Failed to capture proof for {}: {}", reason, e);
                return CaptureOutcome::CaptureFailed(e);
            }
        };

        self.cooldown.last_evidence_sent_at_ms = Some(now_ms);
        self.emitted += 1;
        metrics::counter!("proctor_evidence_emitted_total", "event_type" => event_type.as_str())
            .increment(1);
        info!(
            "Violation {} -> {} captured ({}ms)",
            reason, event_type, event.duration_ms
        );

        CaptureOutcome::Emitted(event)
    }

    fn build_event(
        &self,
        event_type: EventType,
        started_at_ms: u64,
        now_ms: u64,
        frames: &dyn FrameSource,
    ) -> Result<ViolationEvent, EvidenceError> {
        let timestamp = i64::try_from(now_ms)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or(EvidenceError::Timestamp(now_ms))?;

        let frame = frames.capture()?;
        let evidence_image = frame.to_jpeg_data_url(self.config.jpeg_quality)?;

        Ok(ViolationEvent {
            event_type,
            timestamp,
            evidence_image,
            duration_ms: now_ms.saturating_sub(started_at_ms),
            confidence: PLACEHOLDER_CONFIDENCE,
        })
    }
}

impl Default for EvidenceGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
