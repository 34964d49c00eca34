//! Timer manager: one debounced auto-off timer per group.
//!
//! Every timer-start request first re-announces the group as `auto-triggered`
//! so it stays lit. Then the request either arms a new timer or is absorbed
//! by a pending one that already expires later. A timer that runs out
//! publishes `off` for its group.
//!
//! The timer table is shared between the request loop and the timer tasks.
//! Arming, replacing and firing all happen under one lock; each armed timer
//! carries a generation number so a task that lost a race against its
//! replacement does nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use lightcontrol_domain::command::{Command, CommandKind, Source};
use lightcontrol_domain::error::LightControlError;
use lightcontrol_domain::group::{DEFAULT_GROUP_COUNT, GroupId, GroupTarget};
use lightcontrol_domain::message::{TimerStart, seconds_to_duration};

use crate::keys::{self, channels};
use crate::ports::StateStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    pub group_count: u8,
    /// Used when neither the request nor the store names a length.
    pub default_length: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            group_count: DEFAULT_GROUP_COUNT,
            default_length: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
struct PendingTimer {
    expires_at: Instant,
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct TimerTable {
    pending: HashMap<GroupId, PendingTimer>,
    generation: u64,
}

/// Owns the auto-off timers.
pub struct TimerManager<S> {
    store: S,
    config: TimerConfig,
    table: Arc<Mutex<TimerTable>>,
}

impl<S> TimerManager<S>
where
    S: StateStore + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, config: TimerConfig) -> Self {
        Self {
            store,
            config,
            table: Arc::new(Mutex::new(TimerTable::default())),
        }
    }

    /// Consume the timer channel until it closes.
    ///
    /// # Errors
    ///
    /// Returns a store error if the subscription cannot be opened.
    pub async fn run(&self) -> Result<(), LightControlError> {
        let mut subscription = self.store.subscribe(channels::TIMER).await?;
        tracing::info!(channel = channels::TIMER, "timer manager listening");
        while let Some(payload) = subscription.recv().await {
            self.handle_message(&payload).await;
        }
        tracing::info!("timer channel closed");
        Ok(())
    }

    /// Decode and handle one timer-start payload, logging instead of failing.
    pub async fn handle_message(&self, payload: &str) {
        let request = match TimerStart::decode(payload, self.config.group_count) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(%err, payload, "malformed timer request dropped");
                return;
            }
        };

        let length = match request.duration {
            Some(length) => length,
            None => self.default_length().await,
        };
        for group in request.target.groups(self.config.group_count) {
            if let Err(err) = self.start_timer(group, length, request.force).await {
                tracing::warn!(%err, %group, "failed to start timer");
            }
        }
    }

    /// Keep `group` lit and (re)arm its auto-off timer.
    ///
    /// Returns whether a new timer was armed. An unforced request that would
    /// expire no later than the pending timer leaves that timer in place. A
    /// length whose deadline cannot be represented drops the request.
    ///
    /// # Errors
    ///
    /// Returns a store error if the `auto-triggered` command cannot be published.
    pub async fn start_timer(
        &self,
        group: GroupId,
        length: Duration,
        force: bool,
    ) -> Result<bool, LightControlError> {
        let Some(expires_at) = Instant::now().checked_add(length) else {
            tracing::warn!(%group, ?length, "timer length out of range, request dropped");
            return Ok(false);
        };

        let keep_alive = Command::new(
            CommandKind::AutoTriggered,
            GroupTarget::Single(group),
            Source::Trigger,
        );
        self.store
            .publish(channels::CONTROL, &keep_alive.to_payload())
            .await?;

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.pending.get(&group) {
            if !force && expires_at <= existing.expires_at {
                tracing::debug!(%group, ?length, "pending timer expires later, request absorbed");
                return Ok(false);
            }
            existing.handle.abort();
        }

        table.generation += 1;
        let generation = table.generation;
        let handle = tokio::spawn(fire_after(
            self.store.clone(),
            Arc::clone(&self.table),
            group,
            generation,
            expires_at,
        ));
        table.pending.insert(
            group,
            PendingTimer {
                expires_at,
                generation,
                handle,
            },
        );
        tracing::debug!(%group, ?length, force, "timer armed");
        Ok(true)
    }

    /// When the pending timer of `group` fires, if there is one.
    #[must_use]
    pub fn pending_expiry(&self, group: GroupId) -> Option<Instant> {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.pending.get(&group).map(|timer| timer.expires_at)
    }

    async fn default_length(&self) -> Duration {
        match self.store.get(keys::TIMER_LENGTH).await {
            Ok(Some(raw)) => match raw.trim().parse::<f64>().map(seconds_to_duration) {
                Ok(Ok(length)) => return length,
                _ => tracing::warn!(raw, "invalid stored timer length"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "failed to read timer length"),
        }
        self.config.default_length
    }
}

impl<S> Drop for TimerManager<S> {
    fn drop(&mut self) {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for timer in table.pending.values() {
            timer.handle.abort();
        }
    }
}

async fn fire_after<S: StateStore>(
    store: S,
    table: Arc<Mutex<TimerTable>>,
    group: GroupId,
    generation: u64,
    expires_at: Instant,
) {
    tokio::time::sleep_until(expires_at).await;

    {
        let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
        let current = table.pending.get(&group).map(|timer| timer.generation);
        if current != Some(generation) {
            return;
        }
        table.pending.remove(&group);
    }

    let off = Command::new(CommandKind::Off, GroupTarget::Single(group), Source::Trigger);
    match store.publish(channels::CONTROL, &off.to_payload()).await {
        Ok(()) => tracing::info!(%group, "timer expired, group switched off"),
        Err(err) => tracing::warn!(%err, %group, "failed to publish timer off"),
    }
}
