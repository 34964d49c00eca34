//! MQTT adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the MQTT driver and bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Connect to the broker at all.
    pub enabled: bool,
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Base topic prefix for all lightcontrol MQTT communication.
    pub base_topic: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Outgoing requests buffered before publishing blocks.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "lightcontrold".to_string(),
            base_topic: "lightcontrol".to_string(),
            keep_alive_secs: 30,
            channel_capacity: 20,
        }
    }
}

impl MqttConfig {
    /// Client options for rumqttc.
    #[must_use]
    pub fn options(&self) -> rumqttc::MqttOptions {
        let mut options =
            rumqttc::MqttOptions::new(&self.client_id, &self.broker_host, self.broker_port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));
        options
    }
}
