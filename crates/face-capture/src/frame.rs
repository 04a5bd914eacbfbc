//! Video frame types and evidence encoding

use crate::{CaptureError, FrameSource};
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tracing::debug;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (milliseconds since epoch)
    pub timestamp_ms: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ms: u64,
    ) -> Result<Self, CaptureError> {
        let frame = Self {
            data,
            width,
            height,
            timestamp_ms,
        };
        frame.check_len()?;
        Ok(frame)
    }

    /// Buffer must hold exactly `width * height` RGB pixels
    fn check_len(&self) -> Result<(), CaptureError> {
        let expected = (self.width as usize) * (self.height as usize) * 3;
        if self.data.len() != expected {
            return Err(CaptureError::InvalidFrame {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Frame filled with a single color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
            timestamp_ms: 0,
        }
    }

    /// Encode as JPEG bytes
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, CaptureError> {
        // Public fields may have been edited after `new`
        self.check_len()?;
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
        encoder
            .encode(&self.data, self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        debug!("Encoded {}x{} frame to {} JPEG bytes", self.width, self.height, buf.len());
        Ok(buf)
    }

    /// Encode as a `data:image/jpeg;base64,` URL, the form the
    /// assessment backend stores as evidence.
    pub fn to_jpeg_data_url(&self, quality: u8) -> Result<String, CaptureError> {
        let jpeg = self.to_jpeg(quality)?;
        Ok(format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(jpeg)
        ))
    }
}

/// Frame source that always returns the same frame
#[derive(Debug, Clone)]
pub struct StaticFrameSource {
    frame: VideoFrame,
}

impl StaticFrameSource {
    pub fn new(frame: VideoFrame) -> Self {
        Self { frame }
    }

    /// Mid-gray placeholder frame (for replays without video)
    pub fn placeholder(width: u32, height: u32) -> Self {
        Self::new(VideoFrame::solid(width, height, [128, 128, 128]))
    }
}

impl FrameSource for StaticFrameSource {
    fn capture(&self) -> Result<VideoFrame, CaptureError> {
        Ok(self.frame.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_short_buffer() {
        let result = VideoFrame::new(vec![0; 10], 4, 4, 0);
        assert!(matches!(
            result,
            Err(CaptureError::InvalidFrame { expected: 48, actual: 10 })
        ));
    }

    #[test]
    fn test_jpeg_rejects_mismatched_buffer() {
        let frame = VideoFrame {
            data: vec![0; 3],
            width: 4,
            height: 4,
            timestamp_ms: 0,
        };
        assert!(matches!(
            frame.to_jpeg(80),
            Err(CaptureError::InvalidFrame { expected: 48, actual: 3 })
        ));
    }

    #[test]
    fn test_jpeg_data_url() {
        let frame = VideoFrame::solid(16, 16, [200, 40, 40]);
        let url = frame.to_jpeg_data_url(80).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let payload = url.trim_start_matches("data:image/jpeg;base64,");
        let bytes = general_purpose::STANDARD.decode(payload).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_closure_frame_source() {
        let source = || -> Result<VideoFrame, CaptureError> {
            Err(CaptureError::Unavailable("camera stopped".into()))
        };
        assert!(source.capture().is_err());

        let fixed = StaticFrameSource::placeholder(4, 4);
        assert_eq!(fixed.capture().unwrap().width, 4);
    }
}
