//! Proctoring Attention Monitor
//!
//! One monitor per proctoring session. Each tracked frame flows through:
//! - Landmark classification (multi-face, head pose, gaze)
//! - Duration debouncing
//! - Cooldown-gated evidence capture
//! - Fire-and-forget reporting plus a local UI callback
//!
//! Nothing on the per-frame path returns an error; the caller only sees
//! the frame report, emitted events, and callback invocations.

mod config;
mod monitor;

pub use config::MonitorConfig;
pub use monitor::{AttentionMonitor, FrameReport, SessionSummary, ViolationCallback};

pub use attention::{AttentionStatus, DetectionConfig, ViolationReason};
pub use evidence::{EventType, ViolationEvent};

use attention::AttentionError;
use thiserror::Error;

/// Proctor error types
#[derive(Error, Debug)]
pub enum ProctorError {
    #[error(transparent)]
    Attention(#[from] AttentionError),

    #[error("Configuration error: {0}")]
    Config(String),
}
