//! Trigger router: maps sensor activity to timer-start requests.

use std::collections::{BTreeSet, HashMap};

use lightcontrol_domain::error::LightControlError;
use lightcontrol_domain::group::{GroupId, GroupTarget};
use lightcontrol_domain::message::{TimerStart, TriggerEvent};

use crate::keys::channels;
use crate::ports::StateStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRouterConfig {
    /// Sensor key to the groups it lights.
    pub routes: HashMap<String, Vec<GroupId>>,
}

/// Forwards sensor events to the timer manager.
pub struct TriggerRouter<S> {
    store: S,
    config: TriggerRouterConfig,
}

impl<S: StateStore> TriggerRouter<S> {
    pub fn new(store: S, config: TriggerRouterConfig) -> Self {
        Self { store, config }
    }

    /// Consume the triggers channel until it closes.
    ///
    /// # Errors
    ///
    /// Returns a store error if the subscription cannot be opened.
    pub async fn run(&self) -> Result<(), LightControlError> {
        let mut subscription = self.store.subscribe(channels::TRIGGERS).await?;
        tracing::info!(
            channel = channels::TRIGGERS,
            sensors = self.config.routes.len(),
            "trigger router listening"
        );
        while let Some(payload) = subscription.recv().await {
            match TriggerEvent::decode(&payload) {
                Ok(trigger) => {
                    if let Err(err) = self.route(&trigger).await {
                        tracing::warn!(%err, "failed to route trigger");
                    }
                }
                Err(err) => tracing::warn!(%err, payload, "malformed trigger dropped"),
            }
        }
        tracing::info!("triggers channel closed");
        Ok(())
    }

    /// Publish one timer start per distinct group mapped to the trigger's sensor.
    ///
    /// Returns the number of requests published.
    ///
    /// # Errors
    ///
    /// Returns a store error if a request cannot be published.
    pub async fn route(&self, trigger: &TriggerEvent) -> Result<usize, LightControlError> {
        let Some(key) = trigger.key.as_deref() else {
            tracing::error!("trigger without a sensor key");
            return Ok(0);
        };
        let Some(groups) = self.config.routes.get(key) else {
            tracing::debug!(sensor = key, "no groups mapped to sensor");
            return Ok(0);
        };

        let groups: BTreeSet<GroupId> = groups.iter().copied().collect();
        for group in &groups {
            let start = TimerStart {
                target: GroupTarget::Single(*group),
                duration: None,
                force: false,
            };
            self.store
                .publish(channels::TIMER, &start.to_payload())
                .await?;
        }
        tracing::debug!(sensor = key, groups = groups.len(), "trigger routed");
        Ok(groups.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStateStore;
    use std::sync::Arc;

    fn group(id: u8) -> GroupId {
        GroupId::new(id, 4).unwrap()
    }

    fn router() -> (Arc<InMemoryStateStore>, TriggerRouter<Arc<InMemoryStateStore>>) {
        let store = Arc::new(InMemoryStateStore::new());
        let config = TriggerRouterConfig {
            routes: HashMap::from([(
                "hallway-motion".to_string(),
                vec![group(2), group(1), group(2)],
            )]),
        };
        (Arc::clone(&store), TriggerRouter::new(store, config))
    }

    fn trigger(key: Option<&str>) -> TriggerEvent {
        TriggerEvent {
            key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn should_publish_one_timer_start_per_distinct_group() {
        let (store, router) = router();
        let mut timers = store.subscribe(channels::TIMER).await.unwrap();

        let routed = router.route(&trigger(Some("hallway-motion"))).await.unwrap();

        assert_eq!(routed, 2);
        let targets: Vec<u8> = std::iter::from_fn(|| timers.try_recv())
            .map(|payload| TimerStart::decode(&payload, 4).unwrap())
            .inspect(|start| {
                assert_eq!(start.duration, None);
                assert!(!start.force);
            })
            .map(|start| start.target.to_wire())
            .collect();
        assert_eq!(targets, vec![1, 2]);
    }

    #[tokio::test]
    async fn should_ignore_unknown_sensor() {
        let (store, router) = router();
        let mut timers = store.subscribe(channels::TIMER).await.unwrap();

        assert_eq!(router.route(&trigger(Some("garage"))).await.unwrap(), 0);
        assert_eq!(timers.try_recv(), None);
    }

    #[tokio::test]
    async fn should_ignore_trigger_without_key() {
        let (_, router) = router();
        assert_eq!(router.route(&trigger(None)).await.unwrap(), 0);
    }
}
