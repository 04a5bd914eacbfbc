//! Face-mesh landmark types
//!
//! Landmarks follow the MediaPipe face-mesh index scheme (468 mesh points
//! plus 10 iris points when landmark refinement is enabled). Coordinates
//! are normalized to the frame: x and y in [0, 1], z relative depth.

use serde::{Deserialize, Serialize};

/// Anatomical landmark indices used by the attention checks
pub mod mesh {
    /// Forehead center (top of face oval)
    pub const FOREHEAD_CENTER: usize = 10;
    /// Nose tip
    pub const NOSE_TIP: usize = 1;
    /// Chin (bottom of face oval)
    pub const CHIN: usize = 152;
    /// Left eye, corner nearest the nose
    pub const LEFT_EYE_INNER: usize = 133;
    /// Left eye, outer corner
    pub const LEFT_EYE_OUTER: usize = 33;
    /// Right eye, corner nearest the nose
    pub const RIGHT_EYE_INNER: usize = 362;
    /// Right eye, outer corner
    pub const RIGHT_EYE_OUTER: usize = 263;
    /// Left iris center (refined landmarks)
    pub const LEFT_IRIS_CENTER: usize = 473;
    /// Right iris center (refined landmarks)
    pub const RIGHT_IRIS_CENTER: usize = 468;

    /// Point count with iris refinement
    pub const REFINED_POINT_COUNT: usize = 478;
}

/// A single normalized landmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Tracker confidence in [0, 1]; `None` when the tracker omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// A point without a visibility score counts as visible.
    pub fn is_visible(&self, threshold: f32) -> bool {
        match self.visibility {
            Some(v) => v >= threshold,
            None => true,
        }
    }
}

/// All landmarks of one face in one processed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Full refined mesh with every point at the origin.
    /// Tests and synthetic streams overwrite the points they care about.
    pub fn blank() -> Self {
        Self::new(vec![Landmark::default(); mesh::REFINED_POINT_COUNT])
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Set a point, growing the frame if needed
    pub fn set(&mut self, index: usize, landmark: Landmark) {
        if index >= self.points.len() {
            self.points.resize(index + 1, Landmark::default());
        }
        self.points[index] = landmark;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look up several points at once, requiring each to be present and
    /// visible at `threshold`.
    pub fn visible_points<const N: usize>(
        &self,
        indices: [usize; N],
        threshold: f32,
    ) -> Option<[Landmark; N]> {
        let mut out = [Landmark::default(); N];
        for (slot, idx) in out.iter_mut().zip(indices) {
            let point = self.get(idx)?;
            if !point.is_visible(threshold) {
                return None;
            }
            *slot = *point;
        }
        Some(out)
    }
}

/// What the tracker reported for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceObservation {
    /// Number of faces found in the frame
    pub face_count: usize,
    /// Landmarks of the primary face (present when exactly one face was tracked)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkFrame>,
}

impl FaceObservation {
    /// No face in view
    pub fn empty() -> Self {
        Self::default()
    }

    /// Exactly one tracked face
    pub fn single(landmarks: LandmarkFrame) -> Self {
        Self {
            face_count: 1,
            landmarks: Some(landmarks),
        }
    }

    /// Several faces; landmarks are not evaluated
    pub fn crowd(face_count: usize) -> Self {
        Self {
            face_count,
            landmarks: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_visibility_counts_as_visible() {
        assert!(Landmark::new(0.5, 0.5).is_visible(0.9));
        assert!(Landmark::new(0.5, 0.5).with_visibility(0.5).is_visible(0.5));
        assert!(!Landmark::new(0.5, 0.5).with_visibility(0.49).is_visible(0.5));
    }

    #[test]
    fn test_visible_points() {
        let mut frame = LandmarkFrame::blank();
        frame.set(mesh::NOSE_TIP, Landmark::new(0.5, 0.6));
        frame.set(mesh::CHIN, Landmark::new(0.5, 0.9).with_visibility(0.2));

        let [nose] = frame.visible_points([mesh::NOSE_TIP], 0.5).unwrap();
        assert_eq!(nose.y, 0.6);
        assert!(frame.visible_points([mesh::NOSE_TIP, mesh::CHIN], 0.5).is_none());

        // Out of range index means the tracker never produced it
        let short = LandmarkFrame::new(vec![Landmark::new(0.1, 0.1); 10]);
        assert!(short.visible_points([mesh::LEFT_IRIS_CENTER], 0.0).is_none());
    }

    #[test]
    fn test_observation_json() {
        let json = r#"{"faceCount":1,"landmarks":[
            {"x":0.5,"y":0.5},
            {"x":0.4,"y":0.6,"visibility":0.9}
        ]}"#;
        let obs: FaceObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.face_count, 1);
        let landmarks = obs.landmarks.unwrap();
        assert_eq!(landmarks.len(), 2);
        assert_eq!(landmarks.get(1).unwrap().visibility, Some(0.9));

        let none: FaceObservation = serde_json::from_str(r#"{"faceCount":0}"#).unwrap();
        assert_eq!(none, FaceObservation::empty());
    }
}
