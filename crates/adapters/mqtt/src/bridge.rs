//! Bridge between MQTT topics and the store's channels.
//!
//! Inbound: `{base}/control`, `{base}/timer` and `{base}/trigger` payloads
//! are republished unchanged on the matching channel, where the services
//! decode them. Outbound: every state broadcast is mirrored to `{base}/state`.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};

use lightcontrol_app::keys::channels;
use lightcontrol_app::ports::StateStore;
use lightcontrol_domain::error::LightControlError;

use crate::error::MqttError;
use crate::topics::Topics;

/// Pause after a connection error before polling again.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Forwards messages between a broker and a [`StateStore`].
pub struct MqttBridge<S> {
    client: AsyncClient,
    topics: Topics,
    store: S,
}

impl<S: StateStore> MqttBridge<S> {
    pub fn new(client: AsyncClient, topics: Topics, store: S) -> Self {
        Self {
            client,
            topics,
            store,
        }
    }

    /// Subscribe to every inbound topic.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if a request cannot be queued.
    pub async fn subscribe_inbound(&self) -> Result<(), MqttError> {
        for (topic, _) in self.topics.inbound() {
            self.client.subscribe(&topic, QoS::AtLeastOnce).await?;
        }
        Ok(())
    }

    /// Republish one inbound message on its store channel.
    ///
    /// Returns whether the topic was one of ours.
    ///
    /// # Errors
    ///
    /// Returns [`LightControlError::Driver`] when the payload is not UTF-8,
    /// or a store error if the publish fails.
    pub async fn forward_inbound(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<bool, LightControlError> {
        let Some(channel) = self.topics.channel_for(topic) else {
            tracing::warn!(%topic, "unhandled topic");
            return Ok(false);
        };
        let payload = String::from_utf8(payload.to_vec()).map_err(MqttError::from)?;
        self.store.publish(channel, &payload).await?;
        tracing::debug!(%topic, channel, "inbound message forwarded");
        Ok(true)
    }

    /// Drive the MQTT connection forever, forwarding inbound messages.
    ///
    /// Subscriptions are re-issued on every (re)connect.
    pub async fn run_inbound(&self, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = String::from_utf8_lossy(publish.topic.as_ref()).into_owned();
                    if let Err(err) = self.forward_inbound(&topic, &publish.payload).await {
                        tracing::warn!(%err, %topic, "failed to forward message");
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("mqtt connected");
                    if let Err(err) = self.subscribe_inbound().await {
                        tracing::error!(%err, "failed to subscribe inbound topics");
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracing::warn!("mqtt disconnected");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(%err, "mqtt connection error");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// Mirror state broadcasts to the broker until the channel closes.
    ///
    /// # Errors
    ///
    /// Returns a store error if the subscription cannot be opened.
    pub async fn run_outbound(&self) -> Result<(), LightControlError> {
        let mut subscription = self.store.subscribe(channels::BROADCAST).await?;
        let topic = self.topics.state();
        while let Some(payload) = subscription.recv().await {
            if let Err(err) = self
                .client
                .publish(&topic, QoS::AtLeastOnce, false, payload.into_bytes())
                .await
            {
                tracing::warn!(%err, %topic, "failed to mirror state broadcast");
            }
        }
        Ok(())
    }
}
