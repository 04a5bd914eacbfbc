//! Detection configuration

use serde::{Deserialize, Serialize};

use crate::AttentionError;

/// Detection thresholds and checks, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Max allowed head yaw (left/right turn) in degrees
    pub yaw_threshold_degrees: f32,

    /// Max allowed head pitch (up/down tilt) in degrees
    pub pitch_threshold_degrees: f32,

    /// How far the iris may drift from the eye center (0.0 center, 0.5 edge)
    pub gaze_threshold_ratio: f32,

    /// Enable head pose (yaw/pitch) checking
    pub enable_head_pose_check: bool,

    /// Enable gaze direction checking
    pub enable_gaze_check: bool,

    /// Enable checking for more faces than `max_faces_allowed`
    pub enable_multi_face_check: bool,

    /// Ratio-to-degrees scale for yaw. Higher means smaller movements trip the threshold.
    pub yaw_estimation_multiplier: f32,

    /// Ratio-to-degrees scale for pitch
    pub pitch_estimation_multiplier: f32,

    /// Maximum number of faces allowed in frame
    pub max_faces_allowed: usize,

    /// Minimum landmark visibility to trust a point
    pub visibility_threshold: f32,

    /// Evaluate gaze even when head pose already flagged, and let a gaze
    /// flag replace the head pose reason
    pub gaze_overrides_head_pose: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            yaw_threshold_degrees: 25.0,
            pitch_threshold_degrees: 20.0,
            gaze_threshold_ratio: 0.3,
            enable_head_pose_check: true,
            enable_gaze_check: true,
            enable_multi_face_check: true,
            yaw_estimation_multiplier: 50.0,
            pitch_estimation_multiplier: 60.0,
            max_faces_allowed: 1,
            visibility_threshold: 0.5,
            gaze_overrides_head_pose: true,
        }
    }
}

impl DetectionConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            yaw_threshold_degrees: 18.0,
            pitch_threshold_degrees: 15.0,
            gaze_threshold_ratio: 0.35,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            yaw_threshold_degrees: 35.0,
            pitch_threshold_degrees: 30.0,
            gaze_threshold_ratio: 0.2,
            ..Default::default()
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), AttentionError> {
        positive("yaw_threshold_degrees", self.yaw_threshold_degrees)?;
        positive("pitch_threshold_degrees", self.pitch_threshold_degrees)?;
        positive("yaw_estimation_multiplier", self.yaw_estimation_multiplier)?;
        positive("pitch_estimation_multiplier", self.pitch_estimation_multiplier)?;

        if !(self.gaze_threshold_ratio > 0.0 && self.gaze_threshold_ratio < 0.5) {
            return Err(AttentionError::Config(format!(
                "gaze_threshold_ratio {} must be in (0, 0.5)",
                self.gaze_threshold_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(AttentionError::Config(format!(
                "visibility_threshold {} must be in [0, 1]",
                self.visibility_threshold
            )));
        }
        if self.max_faces_allowed == 0 {
            return Err(AttentionError::Config(
                "max_faces_allowed must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn positive(field: &str, value: f32) -> Result<(), AttentionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AttentionError::Config(format!("{field} must be positive, got {value}")))
    }
}
