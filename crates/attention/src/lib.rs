//! Attention Monitoring
//!
//! Real-time attention analysis from face-mesh landmarks:
//! - Multiple face detection
//! - Head pose estimation (yaw, pitch)
//! - Gaze direction from iris position
//! - Duration debouncing of violations

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod state;

pub use analysis::{AttentionStatus, FrameAnalysis};
pub use classifier::{Classification, GazeEstimate, HeadPoseEstimate};
pub use config::DetectionConfig;
pub use state::{DebounceOutcome, ViolationDebouncer, ViolationReason, ViolationSession};

use face_capture::FaceObservation;
use thiserror::Error;
use tracing::info;

/// Attention error types
#[derive(Error, Debug)]
pub enum AttentionError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Classifier plus debouncer for one proctoring session
pub struct AttentionTracker {
    config: DetectionConfig,
    debouncer: ViolationDebouncer,
    track_face_absence: bool,
}

impl AttentionTracker {
    /// Create a tracker; `persist_duration_ms` is how long an immediate
    /// violation must last before it is confirmed
    pub fn new(config: DetectionConfig, persist_duration_ms: u64) -> Result<Self, AttentionError> {
        config.validate()?;
        info!(
            "Attention tracker: yaw {}°, pitch {}°, gaze {}, persist {}ms",
            config.yaw_threshold_degrees,
            config.pitch_threshold_degrees,
            config.gaze_threshold_ratio,
            persist_duration_ms
        );
        Ok(Self {
            config,
            debouncer: ViolationDebouncer::new(persist_duration_ms),
            track_face_absence: false,
        })
    }

    /// Treat zero-face frames as a `no_face` violation instead of a
    /// status-only condition
    pub fn with_face_absence_tracking(mut self, enabled: bool) -> Self {
        self.track_face_absence = enabled;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn session(&self) -> &ViolationSession {
        self.debouncer.session()
    }

    /// Analyze one frame and advance the violation state
    pub fn analyze(&mut self, observation: &FaceObservation, now_ms: u64) -> FrameAnalysis {
        let mut classification = classifier::classify(observation, &self.config);

        if observation.face_count == 0 && self.track_face_absence {
            classification.reason = Some(ViolationReason::NoFace);
        }

        let outcome = self.debouncer.update(classification.reason, now_ms);

        FrameAnalysis {
            timestamp_ms: now_ms,
            face_count: observation.face_count,
            immediate: classification.reason,
            head_pose: classification.head_pose,
            gaze: classification.gaze,
            status: analysis::derive_status(observation.face_count, &outcome),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::frontal_face;
    use face_capture::landmarks::mesh;
    use face_capture::Landmark;

    fn looking_away() -> FaceObservation {
        let mut frame = frontal_face();
        frame.set(mesh::NOSE_TIP, Landmark::new(0.75, 0.5));
        FaceObservation::single(frame)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectionConfig {
            visibility_threshold: 1.5,
            ..Default::default()
        };
        assert!(AttentionTracker::new(config, 3000).is_err());
    }

    #[test]
    fn test_attention_ok_then_violation() {
        let config = DetectionConfig {
            enable_gaze_check: false,
            ..Default::default()
        };
        let mut tracker = AttentionTracker::new(config, 3000).unwrap();

        let ok = tracker.analyze(&FaceObservation::single(frontal_face()), 0);
        assert_eq!(ok.status, AttentionStatus::AttentionOk);
        assert!(!ok.has_violation());

        let started = tracker.analyze(&looking_away(), 100);
        assert_eq!(started.immediate, Some(ViolationReason::HeadYaw));
        assert_eq!(started.status, AttentionStatus::PotentialViolation(ViolationReason::HeadYaw));
        assert!(started.confirmed().is_none());

        let confirmed = tracker.analyze(&looking_away(), 3100);
        assert_eq!(confirmed.confirmed(), Some((ViolationReason::HeadYaw, 100)));
    }

    #[test]
    fn test_no_face_is_status_only_by_default() {
        let mut tracker = AttentionTracker::new(DetectionConfig::default(), 3000).unwrap();
        tracker.analyze(&looking_away(), 0);

        for t in (100..20_000).step_by(100) {
            let analysis = tracker.analyze(&FaceObservation::empty(), t);
            assert_eq!(analysis.status, AttentionStatus::NoFace);
            assert!(analysis.confirmed().is_none());
        }
        assert!(!tracker.session().is_tracking());
    }

    #[test]
    fn test_face_absence_tracking() {
        let mut tracker = AttentionTracker::new(DetectionConfig::default(), 3000)
            .unwrap()
            .with_face_absence_tracking(true);

        let first = tracker.analyze(&FaceObservation::empty(), 0);
        assert_eq!(first.status, AttentionStatus::PotentialViolation(ViolationReason::NoFace));

        let confirmed = tracker.analyze(&FaceObservation::empty(), 3000);
        assert_eq!(confirmed.confirmed(), Some((ViolationReason::NoFace, 0)));
    }

    #[test]
    fn test_insufficient_landmarks_count_as_clear() {
        let mut tracker = AttentionTracker::new(DetectionConfig::default(), 3000).unwrap();
        tracker.analyze(&looking_away(), 0);

        let mut hidden = frontal_face();
        hidden.set(mesh::CHIN, Landmark::new(0.5, 0.75).with_visibility(0.1));
        let analysis = tracker.analyze(&FaceObservation::single(hidden), 100);
        assert_eq!(
            analysis.outcome,
            DebounceOutcome::Ended {
                reason: ViolationReason::HeadYaw
            }
        );
        assert_eq!(analysis.status, AttentionStatus::AttentionOk);
    }
}
