//! MQTT reporting sink
//!
//! Publishes each event's backend payload as JSON to
//! `{topic_prefix}/{attempt_id}/webcam-events`.

use async_trait::async_trait;
use evidence::ViolationEvent;
use rumqttc::{AsyncClient, ConnectionError, Event, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{ReportError, ReportingSink};

/// MQTT sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host
    pub broker_url: String,
    /// Broker port
    pub broker_port: u16,
    /// Topic prefix
    pub topic_prefix: String,
    /// Client ID (random when unset)
    pub client_id: Option<String>,
    /// Keep-alive interval (seconds)
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: "localhost".to_string(),
            broker_port: 1883,
            topic_prefix: "attempts".to_string(),
            client_id: None,
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    pub fn topic_for(&self, attempt_id: &str) -> String {
        format!("{}/{}/webcam-events", self.topic_prefix, attempt_id)
    }
}

/// Publishes violation events to an MQTT broker
pub struct MqttSink {
    config: MqttConfig,
    client: Option<AsyncClient>,
    /// Dropped with the client; the event loop stops once it is gone
    alive: Option<Arc<()>>,
    poller: Option<JoinHandle<()>>,
}

impl MqttSink {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            alive: None,
            poller: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Connect to the broker and start polling its event loop
    pub async fn connect(&mut self) -> Result<(), ReportError> {
        let client_id = self
            .config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("proctor-{}", Uuid::new_v4()));
        let mut options = MqttOptions::new(
            client_id,
            &self.config.broker_url,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let alive = Arc::new(());
        let watcher: Weak<()> = Arc::downgrade(&alive);

        // Spawn event loop handler
        let poller = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    // Client dropped and queued publishes flushed
                    Err(ConnectionError::RequestsDone) => break,
                    Err(e) => {
                        if watcher.upgrade().is_none() {
                            debug!("MQTT client gone, dropping connection: {}", e);
                            break;
                        }
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
            debug!("MQTT event loop stopped");
        });

        self.client = Some(client);
        self.alive = Some(alive);
        self.poller = Some(poller);
        info!("Connected to MQTT broker: {}", self.config.broker_url);
        Ok(())
    }

    /// Drop the client and wait for the event loop to flush and stop
    pub async fn disconnect(&mut self) {
        self.client = None;
        self.alive = None;
        if let Some(poller) = self.poller.take() {
            if let Err(e) = poller.await {
                warn!("MQTT event loop task failed: {}", e);
            }
            info!("Disconnected from MQTT broker: {}", self.config.broker_url);
        }
    }
}

/// JSON body published for an event
pub(crate) fn encode_payload(event: &ViolationEvent) -> Result<Vec<u8>, ReportError> {
    serde_json::to_vec(&event.to_payload()).map_err(|e| ReportError::Serialization(e.to_string()))
}

#[async_trait]
impl ReportingSink for MqttSink {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn submit(&self, attempt_id: &str, event: &ViolationEvent) -> Result<(), ReportError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ReportError::Connection("Not connected".to_string()))?;

        let payload = encode_payload(event)?;
        let topic = self.config.topic_for(attempt_id);

        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| ReportError::Publish(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use evidence::EventType;

    fn event() -> ViolationEvent {
        ViolationEvent {
            event_type: EventType::LookingAway,
            timestamp: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
            evidence_image: "data:image/jpeg;base64,/9j/".into(),
            duration_ms: 3000,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_topic() {
        let config = MqttConfig::default();
        assert_eq!(config.topic_for("42"), "attempts/42/webcam-events");
    }

    #[test]
    fn test_payload_is_backend_json() {
        let bytes = encode_payload(&event()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["eventType"], "LOOKING_AWAY");
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00.000Z");
        assert_eq!(json["details"]["duration"], 3000);
    }

    #[tokio::test]
    async fn test_disconnect_stops_event_loop() {
        let mut sink = MqttSink::new(MqttConfig {
            broker_url: "127.0.0.1".into(),
            broker_port: 1,
            ..Default::default()
        });
        sink.connect().await.unwrap();
        assert!(sink.is_connected());

        // Nothing listens on port 1; the loop must still end once the client is gone
        tokio::time::timeout(Duration::from_secs(30), sink.disconnect())
            .await
            .expect("event loop stopped");
        assert!(!sink.is_connected());
        assert!(sink.poller.is_none());
    }

    #[tokio::test]
    async fn test_submit_requires_connection() {
        let sink = MqttSink::new(MqttConfig::default());
        assert!(!sink.is_connected());
        let result = sink.submit("42", &event()).await;
        assert!(matches!(result, Err(ReportError::Connection(_))));
    }
}
