//! Violation tracking over time

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Default time an immediate violation must persist before it counts
pub const DEFAULT_PERSIST_DURATION_MS: u64 = 3000;

/// Why a frame was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    HeadYaw,
    HeadPitch,
    GazeDirection,
    MultipleFaces,
    NoFace,
}

impl ViolationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationReason::HeadYaw => "head_yaw",
            ViolationReason::HeadPitch => "head_pitch",
            ViolationReason::GazeDirection => "gaze_direction",
            ViolationReason::MultipleFaces => "multiple_faces",
            ViolationReason::NoFace => "no_face",
        }
    }
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The violation currently being timed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationSession {
    pub reason: Option<ViolationReason>,
    pub started_at_ms: Option<u64>,
}

impl ViolationSession {
    pub fn is_tracking(&self) -> bool {
        self.reason.is_some()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Result of feeding one classifier verdict to the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// Nothing tracked
    Idle,
    /// A tracked violation stopped this frame
    Ended { reason: ViolationReason },
    /// A new violation type started its timer
    Started { reason: ViolationReason },
    /// Same violation persisting, threshold not yet met
    Pending { reason: ViolationReason, elapsed_ms: u64 },
    /// Threshold met; capture evidence for the window that began at `started_at_ms`
    Confirmed { reason: ViolationReason, started_at_ms: u64 },
}

impl DebounceOutcome {
    /// Reason currently tracked after this transition
    pub fn active_reason(&self) -> Option<ViolationReason> {
        match *self {
            DebounceOutcome::Idle | DebounceOutcome::Ended { .. } => None,
            DebounceOutcome::Started { reason }
            | DebounceOutcome::Pending { reason, .. }
            | DebounceOutcome::Confirmed { reason, .. } => Some(reason),
        }
    }
}

/// Requires an immediate violation to persist before confirming it.
///
/// After a confirmation the timer restarts rather than clearing, so a
/// violation that keeps going is confirmed again once per window.
#[derive(Debug, Clone)]
pub struct ViolationDebouncer {
    session: ViolationSession,
    persist_duration_ms: u64,
}

impl ViolationDebouncer {
    pub fn new(persist_duration_ms: u64) -> Self {
        Self {
            session: ViolationSession::default(),
            persist_duration_ms,
        }
    }

    pub fn session(&self) -> &ViolationSession {
        &self.session
    }

    pub fn persist_duration_ms(&self) -> u64 {
        self.persist_duration_ms
    }

    /// Advance the state machine with this frame's immediate verdict.
    /// `None` covers both "attention OK" and "could not classify".
    pub fn update(&mut self, immediate: Option<ViolationReason>, now_ms: u64) -> DebounceOutcome {
        let Some(reason) = immediate else {
            return match self.session.reason {
                Some(previous) => {
                    info!("Violation ({}) ended", previous);
                    self.session.clear();
                    DebounceOutcome::Ended { reason: previous }
                }
                None => DebounceOutcome::Idle,
            };
        };

        match (self.session.reason, self.session.started_at_ms) {
            (Some(current), Some(started_at_ms)) if current == reason => {
                let elapsed_ms = now_ms.saturating_sub(started_at_ms);
                if elapsed_ms >= self.persist_duration_ms {
                    info!("Violation {} persisted {}ms, confirming", reason, elapsed_ms);
                    self.session.started_at_ms = Some(now_ms);
                    DebounceOutcome::Confirmed {
                        reason,
                        started_at_ms,
                    }
                } else {
                    DebounceOutcome::Pending { reason, elapsed_ms }
                }
            }
            _ => {
                debug!("New immediate violation detected: {}. Starting timer.", reason);
                self.session = ViolationSession {
                    reason: Some(reason),
                    started_at_ms: Some(now_ms),
                };
                DebounceOutcome::Started { reason }
            }
        }
    }
}

impl Default for ViolationDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_PERSIST_DURATION_MS)
    }
}
