//! Session Replay
//!
//! Feeds a recorded face-tracker session (one JSON object per line) through
//! an attention monitor and delivers the resulting events to a sink.

use anyhow::{bail, Context};
use face_capture::{FaceObservation, StaticFrameSource};
use proctor::{AttentionMonitor, MonitorConfig, SessionSummary};
use reporting::{Dispatcher, MemorySink, MqttConfig, MqttSink, ReportingSink};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Where replayed events go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Memory,
    Mqtt,
}

/// Replay settings, from `proctor.{toml,yaml,json}` and `PROCTOR_*` variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Recorded session (JSON Lines)
    pub input: PathBuf,
    /// Attempt the events belong to
    pub attempt_id: String,
    pub sink: SinkKind,
    pub mqtt: MqttConfig,
    pub monitor: MonitorConfig,
    /// Size of the placeholder evidence frame
    pub frame_width: u32,
    pub frame_height: u32,
    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("session.jsonl"),
            attempt_id: "replay".to_string(),
            sink: SinkKind::Memory,
            mqtt: MqttConfig::default(),
            monitor: MonitorConfig::default(),
            frame_width: 320,
            frame_height: 240,
            log_json: false,
        }
    }
}

impl ReplaySettings {
    /// Layer the optional config file under environment overrides
    /// (`PROCTOR_MONITOR__COOLDOWN_MS=5000`)
    pub fn load(file: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("PROCTOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load settings")?;

        settings
            .try_deserialize()
            .context("Invalid settings")
    }
}

/// One recorded tracker frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub observation: FaceObservation,
}

/// Parse a JSON Lines session; blank lines are ignored
pub fn parse_records(input: &str) -> anyhow::Result<Vec<ReplayRecord>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", i + 1))
        })
        .collect()
}

/// Outcome of a replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub summary: SessionSummary,
    pub delivered: usize,
    pub failed: usize,
    /// Records dropped for going back in time
    pub skipped: usize,
}

/// Run records through a fresh monitor, in order
pub async fn replay(
    records: &[ReplayRecord],
    settings: &ReplaySettings,
    sink: Arc<dyn ReportingSink>,
) -> anyhow::Result<ReplayReport> {
    let dispatcher = Dispatcher::spawn(sink, settings.attempt_id.clone());
    let frames = StaticFrameSource::placeholder(settings.frame_width, settings.frame_height);
    let mut monitor = AttentionMonitor::new(settings.monitor.clone(), Box::new(frames), dispatcher)?
        .on_violation(|reason, _| info!("Warning shown to candidate: {}", reason));

    let mut last_ms = None;
    let mut skipped = 0;
    for record in records {
        if last_ms.is_some_and(|last| record.timestamp_ms < last) {
            warn!("Record at {}ms is out of order, skipping", record.timestamp_ms);
            skipped += 1;
            continue;
        }
        last_ms = Some(record.timestamp_ms);
        monitor.process_frame(&record.observation, record.timestamp_ms);
    }

    let (summary, stats) = monitor.shutdown().await;
    Ok(ReplayReport {
        summary,
        delivered: stats.delivered,
        failed: stats.failed,
        skipped,
    })
}

/// Read the configured session and replay it into the configured sink
pub async fn run(settings: &ReplaySettings) -> anyhow::Result<ReplayReport> {
    let input = tokio::fs::read_to_string(&settings.input)
        .await
        .with_context(|| format!("Failed to read {}", settings.input.display()))?;
    let records = parse_records(&input)?;
    if records.is_empty() {
        bail!("No records in {}", settings.input.display());
    }
    info!("Replaying {} frames from {}", records.len(), settings.input.display());

    match settings.sink {
        SinkKind::Memory => replay(&records, settings, Arc::new(MemorySink::new())).await,
        SinkKind::Mqtt => {
            let mut sink = MqttSink::new(settings.mqtt.clone());
            sink.connect().await?;
            let sink = Arc::new(sink);
            let report = replay(&records, settings, sink.clone()).await?;

            // Flush queued publishes before the runtime goes away
            if let Ok(mut sink) = Arc::try_unwrap(sink) {
                sink.disconnect().await;
            }
            Ok(report)
        }
    }
}

/// Initialize logging
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to set tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor::EventType;

    fn crowd_session(from: u64, to: u64) -> String {
        (from..=to)
            .step_by(100)
            .map(|t| format!(r#"{{"timestampMs":{},"faceCount":2}}"#, t))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_records() {
        let input = r#"{"timestampMs":0,"faceCount":0}

{"timestampMs":100,"faceCount":1,"landmarks":[{"x":0.5,"y":0.5,"z":0.0,"visibility":0.9}]}"#;
        let records = parse_records(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].observation, FaceObservation::empty());
        assert_eq!(records[1].timestamp_ms, 100);
        let landmarks = records[1].observation.landmarks.as_ref().unwrap();
        assert_eq!(landmarks.get(0).unwrap().visibility, Some(0.9));
    }

    #[test]
    fn test_parse_error_names_line() {
        let input = "{\"timestampMs\":0,\"faceCount\":0}\n{\"faceCount\":1}";
        let err = parse_records(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ReplaySettings::default();
        assert_eq!(settings.sink, SinkKind::Memory);
        assert_eq!(settings.monitor, MonitorConfig::default());

        let parsed: ReplaySettings =
            serde_json::from_str(r#"{"sink":"mqtt","monitor":{"cooldown_ms":5000}}"#).unwrap();
        assert_eq!(parsed.sink, SinkKind::Mqtt);
        assert_eq!(parsed.monitor.cooldown_ms, 5000);
        assert_eq!(parsed.monitor.violation_persist_ms, 3000);
    }

    #[tokio::test]
    async fn test_replay_reports_sustained_crowd() {
        let records = parse_records(&crowd_session(0, 3500)).unwrap();
        let sink = Arc::new(MemorySink::new());
        let settings = ReplaySettings {
            attempt_id: "attempt-9".into(),
            ..Default::default()
        };

        let report = replay(&records, &settings, sink.clone()).await.unwrap();
        assert_eq!(report.summary.events_emitted, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.skipped, 0);

        let events = sink.events_for("attempt-9");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::MultipleFaces);
        assert!(events[0].evidence_image.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_out_of_order_records_skipped() {
        let mut records = parse_records(&crowd_session(0, 1000)).unwrap();
        records.push(ReplayRecord {
            timestamp_ms: 500,
            observation: FaceObservation::crowd(2),
        });
        let sink = Arc::new(MemorySink::new());

        let report = replay(&records, &ReplaySettings::default(), sink).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.summary.frames_processed, 11);
    }
}
