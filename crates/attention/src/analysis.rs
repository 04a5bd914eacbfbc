//! Per-frame analysis results and live status

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classifier::{GazeEstimate, HeadPoseEstimate};
use crate::state::{DebounceOutcome, ViolationReason};

/// Status line for live display, derivable on every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttentionStatus {
    /// One face, nothing flagged
    AttentionOk,

    /// No face in view
    NoFace,

    /// Several faces with the multi-face check disabled
    MultipleFaces(usize),

    /// Immediate violation being timed
    PotentialViolation(ViolationReason),

    /// Violation confirmed and evidence being captured
    CapturingProof(ViolationReason),
}

impl fmt::Display for AttentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttentionStatus::AttentionOk => f.write_str("Attention OK"),
            AttentionStatus::NoFace => f.write_str("No face detected"),
            AttentionStatus::MultipleFaces(n) => write!(f, "Multiple faces: {n}"),
            AttentionStatus::PotentialViolation(reason) => {
                write!(f, "Potential Violation: {reason}")
            }
            AttentionStatus::CapturingProof(reason) => {
                write!(f, "Violation: {reason}. Capturing proof...")
            }
        }
    }
}

/// Complete analysis of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    /// Frame time (milliseconds since epoch)
    pub timestamp_ms: u64,

    /// Faces reported by the tracker
    pub face_count: usize,

    /// Immediate (non-debounced) verdict
    pub immediate: Option<ViolationReason>,

    /// Head pose estimate, when computable
    pub head_pose: Option<HeadPoseEstimate>,

    /// Gaze estimate, when computable
    pub gaze: Option<GazeEstimate>,

    /// Debouncer transition for this frame
    pub outcome: DebounceOutcome,

    /// Live status
    pub status: AttentionStatus,
}

impl FrameAnalysis {
    /// Violation to capture evidence for, with the start of its window
    pub fn confirmed(&self) -> Option<(ViolationReason, u64)> {
        match self.outcome {
            DebounceOutcome::Confirmed {
                reason,
                started_at_ms,
            } => Some((reason, started_at_ms)),
            _ => None,
        }
    }

    /// Whether a violation is being tracked after this frame
    pub fn has_violation(&self) -> bool {
        self.outcome.active_reason().is_some()
    }
}

/// Status for a frame given its face count and debounce result
pub(crate) fn derive_status(face_count: usize, outcome: &DebounceOutcome) -> AttentionStatus {
    if let Some(reason) = outcome.active_reason() {
        return AttentionStatus::PotentialViolation(reason);
    }
    match face_count {
        0 => AttentionStatus::NoFace,
        1 => AttentionStatus::AttentionOk,
        n => AttentionStatus::MultipleFaces(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(AttentionStatus::AttentionOk.to_string(), "Attention OK");
        assert_eq!(AttentionStatus::NoFace.to_string(), "No face detected");
        assert_eq!(AttentionStatus::MultipleFaces(3).to_string(), "Multiple faces: 3");
        assert_eq!(
            AttentionStatus::PotentialViolation(ViolationReason::GazeDirection).to_string(),
            "Potential Violation: gaze_direction"
        );
        assert_eq!(
            AttentionStatus::CapturingProof(ViolationReason::HeadYaw).to_string(),
            "Violation: head_yaw. Capturing proof..."
        );
    }

    #[test]
    fn test_derive_status() {
        assert_eq!(derive_status(0, &DebounceOutcome::Idle), AttentionStatus::NoFace);
        assert_eq!(
            derive_status(1, &DebounceOutcome::Ended { reason: ViolationReason::HeadPitch }),
            AttentionStatus::AttentionOk
        );
        assert_eq!(derive_status(2, &DebounceOutcome::Idle), AttentionStatus::MultipleFaces(2));
        assert_eq!(
            derive_status(
                2,
                &DebounceOutcome::Pending {
                    reason: ViolationReason::MultipleFaces,
                    elapsed_ms: 10,
                }
            ),
            AttentionStatus::PotentialViolation(ViolationReason::MultipleFaces)
        );
    }
}
