//! MQTT adapter error types.

use lightcontrol_domain::error::LightControlError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client could not queue a request.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),

    /// An inbound payload was not UTF-8 text.
    #[error("MQTT payload is not UTF-8")]
    PayloadEncoding(#[from] std::string::FromUtf8Error),
}

impl From<MqttError> for LightControlError {
    fn from(err: MqttError) -> Self {
        Self::Driver(Box::new(err))
    }
}
