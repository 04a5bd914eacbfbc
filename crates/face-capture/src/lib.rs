//! Face Capture Library for Proctoring Sessions
//!
//! Data contracts between the upstream face-mesh tracker and the
//! attention engine:
//! - Per-frame normalized facial landmarks (MediaPipe face-mesh indexing)
//! - Face count observations
//! - Still frames for violation evidence, encoded as JPEG data URLs

pub mod frame;
pub mod landmarks;

pub use frame::{StaticFrameSource, VideoFrame};
pub use landmarks::{FaceObservation, Landmark, LandmarkFrame};

use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Frame unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Supplies the current video frame when evidence must be captured.
///
/// Implemented by whatever owns the camera; the attention engine only
/// calls it at capture time.
pub trait FrameSource: Send {
    fn capture(&self) -> Result<VideoFrame, CaptureError>;
}

impl<F> FrameSource for F
where
    F: Fn() -> Result<VideoFrame, CaptureError> + Send,
{
    fn capture(&self) -> Result<VideoFrame, CaptureError> {
        self()
    }
}

