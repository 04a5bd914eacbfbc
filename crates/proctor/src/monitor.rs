//! Per-session attention monitor

use attention::{AttentionStatus, AttentionTracker, FrameAnalysis, ViolationReason};
use evidence::{CaptureOutcome, EvidenceGate, ViolationEvent};
use face_capture::{FaceObservation, FrameSource};
use reporting::{DispatchStats, Dispatcher};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

use crate::{MonitorConfig, ProctorError};

/// Local notification fired with the reason and the evidence image
pub type ViolationCallback = Box<dyn FnMut(ViolationReason, &str) + Send>;

/// Counters for one proctoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub violations_confirmed: u64,
    pub events_emitted: u64,
    pub events_suppressed: u64,
    /// Warnings shown to the candidate
    pub warnings: u64,
    pub callback_failures: u64,
}

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub analysis: FrameAnalysis,
    /// Live status, including capture state
    pub status: AttentionStatus,
    /// Event emitted on this frame, if any
    pub event: Option<ViolationEvent>,
}

/// Drives one proctoring session from tracker frames to reported events
pub struct AttentionMonitor {
    tracker: AttentionTracker,
    gate: EvidenceGate,
    frames: Box<dyn FrameSource>,
    dispatcher: Dispatcher,
    on_violation: Option<ViolationCallback>,
    summary: SessionSummary,
    status: Option<AttentionStatus>,
}

impl AttentionMonitor {
    /// Create a monitor for one session
    pub fn new(
        config: MonitorConfig,
        frames: Box<dyn FrameSource>,
        dispatcher: Dispatcher,
    ) -> Result<Self, ProctorError> {
        config.validate()?;

        let tracker = AttentionTracker::new(config.detection.clone(), config.violation_persist_ms)?
            .with_face_absence_tracking(config.report_face_absence);
        let gate = EvidenceGate::new(config.gate_config());

        info!("Attention monitor started for attempt {}", dispatcher.attempt_id());
        Ok(Self {
            tracker,
            gate,
            frames,
            dispatcher,
            on_violation: None,
            summary: SessionSummary::default(),
            status: None,
        })
    }

    /// Register the UI callback
    pub fn on_violation<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ViolationReason, &str) + Send + 'static,
    {
        self.on_violation = Some(Box::new(callback));
        self
    }

    pub fn attempt_id(&self) -> &str {
        self.dispatcher.attempt_id()
    }

    /// Status after the last processed frame
    pub fn status(&self) -> Option<AttentionStatus> {
        self.status
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Process one tracker frame. Frames must arrive in time order.
    pub fn process_frame(&mut self, observation: &FaceObservation, now_ms: u64) -> FrameReport {
        self.summary.frames_processed += 1;

        let analysis = self.tracker.analyze(observation, now_ms);
        let mut status = analysis.status;
        let mut emitted = None;

        if let Some((reason, started_at_ms)) = analysis.confirmed() {
            self.summary.violations_confirmed += 1;
            metrics::counter!("proctor_violations_confirmed_total", "reason" => reason.as_str())
                .increment(1);

            match self
                .gate
                .try_capture(reason, started_at_ms, now_ms, self.frames.as_ref())
            {
                CaptureOutcome::Emitted(event) => {
                    status = AttentionStatus::CapturingProof(reason);
                    self.deliver(reason, &event);
                    emitted = Some(event);
                }
                CaptureOutcome::CoolingDown { .. } => self.summary.events_suppressed += 1,
                CaptureOutcome::Unmapped | CaptureOutcome::CaptureFailed(_) => {}
            }
        }

        if self.status != Some(status) {
            info!("Status: {}", status);
            self.status = Some(status);
        }

        FrameReport {
            analysis,
            status,
            event: emitted,
        }
    }

    fn deliver(&mut self, reason: ViolationReason, event: &ViolationEvent) {
        self.summary.events_emitted += 1;
        self.dispatcher.report(event.clone());

        // The warning stands whether or not the backend accepts the event
        self.summary.warnings += 1;
        if let Some(callback) = self.on_violation.as_mut() {
            let image = event.evidence_image.as_str();
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(reason, image)));
            if result.is_err() {
                warn!("Violation callback panicked for {}", reason);
                self.summary.callback_failures += 1;
            }
        }
    }

    /// End the session. Tracked violation and cooldown state go with the
    /// monitor; events already dispatched are delivered or fail first.
    pub async fn shutdown(self) -> (SessionSummary, DispatchStats) {
        let summary = self.summary;
        let attempt_id = self.dispatcher.attempt_id().to_string();
        let stats = self.dispatcher.shutdown().await;
        info!(
            "Attention monitor stopped for attempt {}: {} events ({} delivered, {} failed)",
            attempt_id, summary.events_emitted, stats.delivered, stats.failed
        );
        (summary, stats)
    }
}
