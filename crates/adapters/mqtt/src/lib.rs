//! # lightcontrol-adapter-mqtt
//!
//! MQTT adapter: connects lightcontrol to a broker.
//!
//! ## Responsibilities
//! - [`MqttLightDriver`]: implement the `LightDriver` port by publishing one
//!   JSON command per operation on `{base}/group/{id}/set`
//! - [`MqttBridge`]: forward inbound `{base}/control`, `{base}/timer` and
//!   `{base}/trigger` messages onto the matching store channels, and the
//!   state-broadcast channel out to `{base}/state`
//!
//! ## Dependency rule
//! Same as other adapters: depends on `lightcontrol-app` and `lightcontrol-domain`.

pub mod bridge;
pub mod config;
pub mod driver;
pub mod error;
pub mod topics;

pub use bridge::MqttBridge;
pub use config::MqttConfig;
pub use driver::MqttLightDriver;
pub use error::MqttError;
pub use topics::Topics;

/// Open a client and its event loop for `config`.
///
/// Nothing is sent until the event loop is polled.
#[must_use]
pub fn connect(config: &MqttConfig) -> (rumqttc::AsyncClient, rumqttc::EventLoop) {
    rumqttc::AsyncClient::new(config.options(), config.channel_capacity)
}
