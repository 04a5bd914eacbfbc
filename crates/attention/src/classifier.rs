//! Per-frame landmark classification
//!
//! Stateless: each call maps one observation to an immediate violation
//! reason (or none). Duration handling lives in [`crate::state`].

use face_capture::landmarks::mesh;
use face_capture::{FaceObservation, LandmarkFrame};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::ViolationReason;
use crate::DetectionConfig;

/// Inter-eye and face-height distances below this skip the pose sub-check
const MIN_POSE_SPAN: f32 = 0.01;
/// Eye widths below this skip the gaze check
const MIN_EYE_WIDTH: f32 = 0.005;

/// Estimated head rotation in degrees. A `None` axis was skipped because
/// its normalizing distance was degenerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPoseEstimate {
    pub yaw_degrees: Option<f32>,
    pub pitch_degrees: Option<f32>,
}

/// Iris position within each eye, 0.0 at the leftmost corner, 1.0 at the rightmost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeEstimate {
    pub left_ratio: f32,
    pub right_ratio: f32,
}

/// Everything the classifier worked out for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Classification {
    pub reason: Option<ViolationReason>,
    pub head_pose: Option<HeadPoseEstimate>,
    pub gaze: Option<GazeEstimate>,
}

/// Flag frames with more faces than allowed
pub fn check_multi_face(face_count: usize, config: &DetectionConfig) -> Option<ViolationReason> {
    if config.enable_multi_face_check && face_count > config.max_faces_allowed {
        debug!("Multiple faces detected: {}", face_count);
        Some(ViolationReason::MultipleFaces)
    } else {
        None
    }
}

/// True when an iris ratio sits outside `[threshold, 1 - threshold]`.
/// The bounds themselves are allowed.
pub fn gaze_off_center(ratio: f32, threshold: f32) -> bool {
    ratio < threshold || ratio > 1.0 - threshold
}

/// Estimate yaw and pitch from nose position relative to the eyes.
///
/// Returns `None` when the pose landmarks are missing or below the
/// visibility threshold.
pub fn estimate_head_pose(
    frame: &LandmarkFrame,
    config: &DetectionConfig,
) -> Option<HeadPoseEstimate> {
    let [nose, left_inner, right_inner, chin, forehead] = frame.visible_points(
        [
            mesh::NOSE_TIP,
            mesh::LEFT_EYE_INNER,
            mesh::RIGHT_EYE_INNER,
            mesh::CHIN,
            mesh::FOREHEAD_CENTER,
        ],
        config.visibility_threshold,
    )?;

    let eye_mid_x = (left_inner.x + right_inner.x) / 2.0;
    let eye_mid_y = (left_inner.y + right_inner.y) / 2.0;

    let eye_distance = (left_inner.x - right_inner.x).abs();
    let yaw_degrees = (eye_distance > MIN_POSE_SPAN)
        .then(|| (nose.x - eye_mid_x) / eye_distance * config.yaw_estimation_multiplier);

    let face_height = (forehead.y - chin.y).abs();
    let pitch_degrees = (face_height > MIN_POSE_SPAN)
        .then(|| (nose.y - eye_mid_y) / face_height * config.pitch_estimation_multiplier);

    Some(HeadPoseEstimate {
        yaw_degrees,
        pitch_degrees,
    })
}

/// Estimate horizontal iris position in both eyes.
///
/// Needs the pose landmarks as well as iris centers and outer eye corners.
pub fn estimate_gaze(frame: &LandmarkFrame, config: &DetectionConfig) -> Option<GazeEstimate> {
    frame.visible_points(
        [mesh::NOSE_TIP, mesh::CHIN, mesh::FOREHEAD_CENTER],
        config.visibility_threshold,
    )?;
    let [left_iris, left_outer, left_inner, right_iris, right_outer, right_inner] = frame
        .visible_points(
            [
                mesh::LEFT_IRIS_CENTER,
                mesh::LEFT_EYE_OUTER,
                mesh::LEFT_EYE_INNER,
                mesh::RIGHT_IRIS_CENTER,
                mesh::RIGHT_EYE_OUTER,
                mesh::RIGHT_EYE_INNER,
            ],
            config.visibility_threshold,
        )?;

    let left_width = (left_outer.x - left_inner.x).abs();
    let right_width = (right_outer.x - right_inner.x).abs();
    if left_width <= MIN_EYE_WIDTH || right_width <= MIN_EYE_WIDTH {
        return None;
    }

    // Measured from whichever corner is further left, so mirrored or
    // turned faces still give a 0..1 ratio.
    let left_ratio = (left_iris.x - left_outer.x.min(left_inner.x)) / left_width;
    let right_ratio = (right_iris.x - right_outer.x.min(right_inner.x)) / right_width;

    Some(GazeEstimate {
        left_ratio,
        right_ratio,
    })
}

/// Head pose and gaze checks for a single tracked face.
///
/// Precedence: yaw is checked before pitch and keeps the reason if both
/// trip. Gaze then runs; with `gaze_overrides_head_pose` it always runs
/// and replaces a head pose reason, otherwise it only runs when head pose
/// was clear.
pub fn check_attention(frame: &LandmarkFrame, config: &DetectionConfig) -> Classification {
    let mut classification = Classification::default();

    let head_pose = if config.enable_head_pose_check {
        estimate_head_pose(frame, config)
    } else {
        None
    };
    if config.enable_head_pose_check && head_pose.is_none() {
        debug!("Pose landmarks missing or hidden, skipping head pose");
    }
    if let Some(pose) = head_pose {
        let yaw_flag = pose
            .yaw_degrees
            .is_some_and(|yaw| yaw.abs() > config.yaw_threshold_degrees);
        let pitch_flag = pose
            .pitch_degrees
            .is_some_and(|pitch| pitch.abs() > config.pitch_threshold_degrees);

        classification.reason = if yaw_flag {
            Some(ViolationReason::HeadYaw)
        } else if pitch_flag {
            Some(ViolationReason::HeadPitch)
        } else {
            None
        };
    }
    classification.head_pose = head_pose;

    let run_gaze = config.enable_gaze_check
        && (classification.reason.is_none() || config.gaze_overrides_head_pose);
    if run_gaze {
        classification.gaze = estimate_gaze(frame, config);
        if let Some(gaze) = classification.gaze {
            let threshold = config.gaze_threshold_ratio;
            if gaze_off_center(gaze.left_ratio, threshold)
                || gaze_off_center(gaze.right_ratio, threshold)
            {
                classification.reason = Some(ViolationReason::GazeDirection);
            }
        }
    }

    classification
}

/// Classify one tracker observation.
///
/// The multi-face check runs first and short-circuits. Zero faces and a
/// single face without landmarks both yield no reason; the caller decides
/// what absence means.
pub fn classify(observation: &FaceObservation, config: &DetectionConfig) -> Classification {
    if let Some(reason) = check_multi_face(observation.face_count, config) {
        return Classification {
            reason: Some(reason),
            ..Default::default()
        };
    }

    match (&observation.landmarks, observation.face_count) {
        (Some(landmarks), 1) => check_attention(landmarks, config),
        _ => Classification::default(),
    }
}
