//! In-memory [`StateStore`] for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use lightcontrol_domain::error::LightControlError;

use crate::message_bus::InProcessMessageBus;
use crate::ports::{StateStore, Subscription};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Keeps every key in a `HashMap` and fans messages out in-process.
///
/// Expiry is measured on the tokio clock, so paused-time tests can step
/// over TTLs.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: Mutex<HashMap<String, Entry>>,
    bus: InProcessMessageBus,
}

impl InMemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, key: &str, value: &str, expires_at: Option<Instant>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    fn read(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, LightControlError> {
        Ok(self.read(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LightControlError> {
        self.write(key, value, None);
        Ok(())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), LightControlError> {
        // a deadline past the clock range never expires
        self.write(key, value, Instant::now().checked_add(ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, LightControlError> {
        Ok(self.read(key).is_some())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), LightControlError> {
        let receivers = self.bus.publish(channel, payload);
        tracing::trace!(channel, receivers, "published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, LightControlError> {
        Ok(self.bus.subscribe(channel))
    }
}
