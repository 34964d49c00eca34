//! In-process message bus backed by one tokio broadcast channel per topic.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::ports::Subscription;

/// Default per-topic buffer before slow subscribers start losing messages.
pub const DEFAULT_CAPACITY: usize = 256;

/// Topic-addressed publish/subscribe using tokio [`broadcast`] channels.
///
/// Publishing succeeds even when there are no active subscribers
/// (the message is simply dropped).
#[derive(Debug)]
pub struct InProcessMessageBus {
    capacity: usize,
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl Default for InProcessMessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl InProcessMessageBus {
    /// Create a new bus with the given per-topic capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Publish `payload` on `topic`, returning how many subscribers got it.
    pub fn publish(&self, topic: &str, payload: &str) -> usize {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .get(topic)
            .and_then(|sender| sender.send(payload.to_string()).ok())
            .unwrap_or(0)
    }

    /// Subscribe to `topic`.
    ///
    /// The subscription receives every message published *after* this call.
    #[must_use]
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let receiver = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Subscription::new(topic, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_deliver_message_to_subscriber() {
        let bus = InProcessMessageBus::default();
        let mut sub = bus.subscribe("control");

        assert_eq!(bus.publish("control", "hello"), 1);

        assert_eq!(sub.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn should_deliver_message_to_multiple_subscribers() {
        let bus = InProcessMessageBus::default();
        let mut first = bus.subscribe("control");
        let mut second = bus.subscribe("control");

        bus.publish("control", "hello");

        assert_eq!(first.recv().await.as_deref(), Some("hello"));
        assert_eq!(second.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn should_keep_topics_apart() {
        let bus = InProcessMessageBus::default();
        let mut timer = bus.subscribe("timer");

        bus.publish("control", "not for timer");
        bus.publish("timer", "for timer");

        assert_eq!(timer.recv().await.as_deref(), Some("for timer"));
    }

    #[test]
    fn should_succeed_when_no_subscribers() {
        let bus = InProcessMessageBus::default();
        assert_eq!(bus.publish("control", "dropped"), 0);
    }

    #[tokio::test]
    async fn should_not_deliver_messages_published_before_subscription() {
        let bus = InProcessMessageBus::default();
        let early = bus.subscribe("control");
        bus.publish("control", "early");

        let mut late = bus.subscribe("control");
        bus.publish("control", "later");

        assert_eq!(late.recv().await.as_deref(), Some("later"));
        drop(early);
    }

    #[tokio::test]
    async fn should_skip_lagged_messages_and_continue() {
        let bus = InProcessMessageBus::new(2);
        let mut sub = bus.subscribe("control");

        for n in 0..5 {
            bus.publish("control", &n.to_string());
        }

        assert_eq!(sub.recv().await.as_deref(), Some("3"));
        assert_eq!(sub.recv().await.as_deref(), Some("4"));
    }
}
