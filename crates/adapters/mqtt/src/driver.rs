//! MQTT implementation of [`LightDriver`].
//!
//! Each operation becomes one small JSON document on the group's `set`
//! topic. The controller on the other side owns the radio protocol.

use rumqttc::{AsyncClient, QoS};
use serde::Serialize;

use lightcontrol_app::ports::LightDriver;
use lightcontrol_domain::error::LightControlError;
use lightcontrol_domain::group::GroupId;
use lightcontrol_domain::light::{Brightness, Color};

use crate::error::MqttError;
use crate::topics::Topics;

/// Body of a group `set` message.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum SetMessage<'a> {
    State(&'a str),
    Color(&'a str),
    Brightness(u8),
}

/// Publishes driver operations to an MQTT broker.
#[derive(Clone)]
pub struct MqttLightDriver {
    client: AsyncClient,
    topics: Topics,
}

impl MqttLightDriver {
    #[must_use]
    pub fn new(client: AsyncClient, topics: Topics) -> Self {
        Self { client, topics }
    }

    async fn send(&self, group: GroupId, message: SetMessage<'_>) -> Result<(), MqttError> {
        let payload = serde_json::to_vec(&message).unwrap_or_default();
        let topic = self.topics.group_set(group);
        self.client
            .publish(&topic, QoS::AtLeastOnce, false, payload)
            .await?;
        tracing::debug!(%topic, ?message, "driver command published");
        Ok(())
    }
}

impl LightDriver for MqttLightDriver {
    async fn turn_on(&self, group: GroupId) -> Result<(), LightControlError> {
        Ok(self.send(group, SetMessage::State("on")).await?)
    }

    async fn turn_off(&self, group: GroupId) -> Result<(), LightControlError> {
        Ok(self.send(group, SetMessage::State("off")).await?)
    }

    async fn set_color(&self, color: &Color, group: GroupId) -> Result<(), LightControlError> {
        Ok(self.send(group, SetMessage::Color(color.as_str())).await?)
    }

    async fn set_brightness(
        &self,
        level: Brightness,
        group: GroupId,
    ) -> Result<(), LightControlError> {
        Ok(self.send(group, SetMessage::Brightness(level.get())).await?)
    }
}
