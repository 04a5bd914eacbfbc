//! Monitor configuration

use attention::state::DEFAULT_PERSIST_DURATION_MS;
use attention::DetectionConfig;
use evidence::{GateConfig, DEFAULT_COOLDOWN_MS};
use serde::{Deserialize, Serialize};

use crate::ProctorError;

/// Everything a proctoring session needs, supplied at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Classifier thresholds and checks
    pub detection: DetectionConfig,

    /// How long an immediate violation must persist (milliseconds)
    pub violation_persist_ms: u64,

    /// Minimum time between evidence submissions (milliseconds)
    pub cooldown_ms: u64,

    /// Debounce and report prolonged face absence as `FACE_NOT_DETECTED`
    pub report_face_absence: bool,

    /// JPEG quality of evidence images (1-100)
    pub evidence_jpeg_quality: u8,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            violation_persist_ms: DEFAULT_PERSIST_DURATION_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            report_face_absence: false,
            evidence_jpeg_quality: 80,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ProctorError> {
        self.detection.validate()?;
        if self.violation_persist_ms == 0 {
            return Err(ProctorError::Config(
                "violation_persist_ms must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.evidence_jpeg_quality) {
            return Err(ProctorError::Config(format!(
                "evidence_jpeg_quality {} must be in 1..=100",
                self.evidence_jpeg_quality
            )));
        }
        Ok(())
    }

    pub(crate) fn gate_config(&self) -> GateConfig {
        GateConfig {
            cooldown_ms: self.cooldown_ms,
            report_face_absence: self.report_face_absence,
            jpeg_quality: self.evidence_jpeg_quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.violation_persist_ms, 3000);
        assert_eq!(config.cooldown_ms, 10_000);
        assert!(!config.report_face_absence);
    }

    #[test]
    fn test_invalid_values() {
        let config = MonitorConfig {
            violation_persist_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProctorError::Config(_))));

        let mut config = MonitorConfig::default();
        config.detection.gaze_threshold_ratio = 0.0;
        assert!(matches!(config.validate(), Err(ProctorError::Attention(_))));
    }
}
