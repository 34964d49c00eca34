//! State store port: shared key/value state and publish/subscribe channels.
//!
//! This is the only thing services share. Values are plain strings; keys and
//! channel names live in [`crate::keys`].

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use lightcontrol_domain::error::LightControlError;

/// Key/value store with expiring keys and fire-and-forget channels.
pub trait StateStore {
    /// Read a key; expired keys read as absent.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, LightControlError>> + Send;

    /// Write a key without expiry, replacing any previous value and TTL.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send;

    /// Write a key that disappears after `ttl`.
    fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, LightControlError>> + Send;

    /// Deliver `payload` to every current subscriber of `channel`.
    ///
    /// Messages published while nobody listens are dropped.
    fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send;

    /// Start receiving messages published on `channel` from now on.
    fn subscribe(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<Subscription, LightControlError>> + Send;
}

impl<T: StateStore + Send + Sync> StateStore for std::sync::Arc<T> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, LightControlError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).set(key, value)
    }

    fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).set_with_expiry(key, value, ttl)
    }

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, LightControlError>> + Send {
        (**self).exists(key)
    }

    fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).publish(channel, payload)
    }

    fn subscribe(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<Subscription, LightControlError>> + Send {
        (**self).subscribe(channel)
    }
}

/// In-order stream of payloads from one channel.
///
/// A subscriber that falls behind loses the oldest messages and keeps going.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    receiver: broadcast::Receiver<String>,
}

impl Subscription {
    #[must_use]
    pub fn new(channel: impl Into<String>, receiver: broadcast::Receiver<String>) -> Self {
        Self {
            channel: channel.into(),
            receiver,
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next payload; `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next payload if one is already buffered.
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(payload) => return Some(payload),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "subscriber lagged, messages dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
