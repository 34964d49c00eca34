//! Command processor: the single writer of per-group light state.
//!
//! Consumes the control channel, decides whether a command may touch a group
//! (manual override, night suppression), and applies it as a sequence of
//! idempotent operations. Each operation compares the wanted value with the
//! stored one; only a change (or a forced re-apply) reaches the driver, the
//! store and the broadcast channel.

use lightcontrol_domain::command::{Command, CommandKind, Source};
use lightcontrol_domain::error::{DecodeError, LightControlError};
use lightcontrol_domain::group::{DEFAULT_GROUP_COUNT, GroupId};
use lightcontrol_domain::light::{Brightness, BrightnessSlot, Color};
use lightcontrol_domain::message::{GroupView, StateBroadcast};

use crate::keys::{self, channels};
use crate::ports::{Clock, LightDriver, StateStore};
use crate::services::program_book::ProgramBook;

/// Static per-group settings written at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSettings {
    pub id: GroupId,
    pub name: String,
    /// Seeds the disabled-at-night flag; `None` leaves the stored flag alone.
    pub disabled_at_night: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProcessorConfig {
    pub group_count: u8,
    pub groups: Vec<GroupSettings>,
}

impl Default for CommandProcessorConfig {
    fn default() -> Self {
        Self {
            group_count: DEFAULT_GROUP_COUNT,
            groups: Vec::new(),
        }
    }
}

/// One driver-facing state change.
#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    On,
    Off,
    Color(&'a Color),
    Brightness(Brightness),
}

/// Applies control commands to groups.
pub struct CommandProcessor<S, D, C> {
    store: S,
    driver: D,
    clock: C,
    programs: ProgramBook<S>,
    config: CommandProcessorConfig,
}

impl<S, D, C> CommandProcessor<S, D, C>
where
    S: StateStore + Clone,
    D: LightDriver,
    C: Clock,
{
    pub fn new(store: S, driver: D, clock: C, config: CommandProcessorConfig) -> Self {
        Self {
            programs: ProgramBook::new(store.clone()),
            store,
            driver,
            clock,
            config,
        }
    }

    /// Write the configured group names and night flags.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be written.
    pub async fn initialize(&self) -> Result<(), LightControlError> {
        for group in &self.config.groups {
            self.store
                .set(&keys::group_name(group.id), &group.name)
                .await?;
            if let Some(disabled) = group.disabled_at_night {
                self.store
                    .set(
                        &keys::group_disabled_at_night(group.id),
                        keys::encode_bool(disabled),
                    )
                    .await?;
            }
        }
        tracing::info!(groups = self.config.groups.len(), "group settings written");
        Ok(())
    }

    /// Consume the control channel until it closes.
    ///
    /// # Errors
    ///
    /// Returns a store error if the subscription cannot be opened.
    pub async fn run(&self) -> Result<(), LightControlError> {
        let mut subscription = self.store.subscribe(channels::CONTROL).await?;
        tracing::info!(channel = channels::CONTROL, "command processor listening");
        while let Some(payload) = subscription.recv().await {
            self.handle_message(&payload).await;
        }
        tracing::info!("control channel closed");
        Ok(())
    }

    /// Decode and process one control payload, logging instead of failing.
    pub async fn handle_message(&self, payload: &str) {
        match Command::decode(payload, self.config.group_count) {
            Ok(command) => {
                if let Err(err) = self.process_command(&command).await {
                    tracing::debug!(%err, %command, "command finished with errors");
                }
            }
            Err(LightControlError::Decode(DecodeError::UnknownCommand(name))) => {
                tracing::error!(command = %name, "unknown command dropped");
            }
            Err(err) => tracing::warn!(%err, payload, "malformed command dropped"),
        }
    }

    /// Apply `command` to every group it targets.
    ///
    /// A failure on one group does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns the first store or driver error encountered.
    #[tracing::instrument(skip_all, fields(command = %command))]
    pub async fn process_command(&self, command: &Command) -> Result<(), LightControlError> {
        let mut first_error = None;
        for group in command.target.groups(self.config.group_count) {
            if let Err(err) = self.process_group(command, group).await {
                tracing::warn!(%err, %group, "command failed for group");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn process_group(&self, command: &Command, group: GroupId) -> Result<(), LightControlError> {
        let manual = command.source == Source::Manual;
        let gated = command.kind.is_mode_gated() || command.kind == CommandKind::AutoTriggered;
        if gated && !manual && !self.is_auto(group).await? {
            tracing::debug!(%group, "group under manual control, command ignored");
            return Ok(());
        }

        if command.kind.takes_manual_control() {
            if manual {
                self.store
                    .set(&keys::group_auto(group), keys::encode_bool(false))
                    .await?;
            } else if command.source == Source::Trigger && self.is_suppressed_at_night(group).await?
            {
                tracing::debug!(%group, "group disabled at night, trigger ignored");
                return Ok(());
            }
        }

        match command.kind {
            CommandKind::Sync => self.sync(group).await,
            CommandKind::On => self.turn_on(group, false).await,
            CommandKind::Off => {
                self.turn_off(group, false).await?;
                self.store
                    .set(&keys::group_auto(group), keys::encode_bool(true))
                    .await
            }
            CommandKind::SetColor => match &command.color {
                Some(color) => self.set_color(group, color, false).await,
                None => {
                    tracing::warn!(%group, "set_color without a color");
                    Ok(())
                }
            },
            CommandKind::SetBrightness => match command.brightness {
                Some(raw) => {
                    self.set_brightness(group, Brightness::clamped(raw), false)
                        .await
                }
                None => {
                    tracing::warn!(%group, "set_brightness without a level");
                    Ok(())
                }
            },
            CommandKind::AutoTriggered => {
                self.turn_on(group, false).await?;
                self.apply_defaults(group).await
            }
            CommandKind::ProgramSync => self.program_sync(group).await,
            CommandKind::Night => {
                self.turn_on(group, true).await?;
                self.set_color(group, &Color::red(), true).await?;
                self.set_brightness(group, Brightness::OFF, true).await
            }
        }
    }

    /// Force the stored state back onto the driver.
    ///
    /// # Errors
    ///
    /// Returns a store or driver error.
    pub async fn sync(&self, group: GroupId) -> Result<(), LightControlError> {
        if !self.is_on(group).await? {
            return self.turn_off(group, true).await;
        }
        self.turn_on(group, true).await?;
        let color = self.stored_color(group).await?.unwrap_or_default();
        self.set_color(group, &color, true).await?;
        let level = self
            .stored_brightness(group, color.slot())
            .await?
            .unwrap_or(Brightness::FULL);
        self.set_brightness(group, level, true).await
    }

    /// Pull the scheduler's defaults into a lit group without a user override.
    ///
    /// # Errors
    ///
    /// Returns a store or driver error.
    pub async fn program_sync(&self, group: GroupId) -> Result<(), LightControlError> {
        if !self.is_on(group).await? {
            tracing::trace!(%group, "group off, program sync skipped");
            return Ok(());
        }
        if self
            .read_flag(&keys::group_user_override(group), false)
            .await?
        {
            tracing::debug!(%group, "user override set, program sync skipped");
            return Ok(());
        }
        self.apply_defaults(group).await
    }

    /// Recompute what observers see for `group`.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be read.
    pub async fn group_view(&self, group: GroupId) -> Result<GroupView, LightControlError> {
        let on = self.is_on(group).await?;
        let name = self.store.get(&keys::group_name(group)).await?;
        let color = self.store.get(&keys::group_color(group)).await?;
        let slot = color
            .as_deref()
            .and_then(|raw| raw.parse::<Color>().ok())
            .unwrap_or_default()
            .slot();
        let current_brightness = self.stored_brightness(group, slot).await?;
        Ok(GroupView {
            on,
            name,
            color,
            current_brightness: current_brightness.map(Brightness::get),
            id: group.get(),
        })
    }

    async fn turn_on(&self, group: GroupId, force: bool) -> Result<(), LightControlError> {
        let key = keys::group_on(group);
        self.apply(group, &key, keys::encode_bool(true), Operation::On, force)
            .await
    }

    async fn turn_off(&self, group: GroupId, force: bool) -> Result<(), LightControlError> {
        let key = keys::group_on(group);
        self.apply(group, &key, keys::encode_bool(false), Operation::Off, force)
            .await
    }

    async fn set_color(
        &self,
        group: GroupId,
        color: &Color,
        force: bool,
    ) -> Result<(), LightControlError> {
        let key = keys::group_color(group);
        self.apply(group, &key, color.as_str(), Operation::Color(color), force)
            .await
    }

    /// Write `level` into the slot of the group's currently stored color.
    async fn set_brightness(
        &self,
        group: GroupId,
        level: Brightness,
        force: bool,
    ) -> Result<(), LightControlError> {
        let slot = self.stored_color(group).await?.unwrap_or_default().slot();
        let key = keys::group_brightness(group, slot);
        let value = level.to_string();
        self.apply(group, &key, &value, Operation::Brightness(level), force)
            .await
    }

    async fn apply_defaults(&self, group: GroupId) -> Result<(), LightControlError> {
        let color = match self.store.get(keys::DEFAULT_COLOR).await? {
            Some(raw) => raw.parse::<Color>().unwrap_or_else(|err| {
                tracing::warn!(%err, raw, "invalid default color, using white");
                Color::White
            }),
            None => Color::White,
        };
        let level = self
            .read_brightness(keys::DEFAULT_BRIGHTNESS)
            .await?
            .unwrap_or(Brightness::FULL);
        self.set_color(group, &color, false).await?;
        self.set_brightness(group, level, false).await
    }

    /// Compare, drive, persist, broadcast.
    ///
    /// A driver failure leaves the stored value untouched so the next
    /// attempt is not mistaken for a no-op.
    async fn apply(
        &self,
        group: GroupId,
        key: &str,
        value: &str,
        operation: Operation<'_>,
        force: bool,
    ) -> Result<(), LightControlError> {
        if !force && self.store.get(key).await?.as_deref() == Some(value) {
            tracing::trace!(%group, key, "unchanged, skipped");
            return Ok(());
        }

        match operation {
            Operation::On => self.driver.turn_on(group).await?,
            Operation::Off => self.driver.turn_off(group).await?,
            Operation::Color(color) => self.driver.set_color(color, group).await?,
            Operation::Brightness(level) => self.driver.set_brightness(level, group).await?,
        }
        self.store.set(key, value).await?;
        tracing::debug!(%group, key, value, force, "applied");

        self.broadcast(group).await;
        Ok(())
    }

    async fn broadcast(&self, group: GroupId) {
        let result = async {
            let view = self.group_view(group).await?;
            let payload = StateBroadcast::for_group(view).to_payload();
            self.store.publish(channels::BROADCAST, &payload).await
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(%err, %group, "state broadcast failed");
        }
    }

    async fn is_suppressed_at_night(&self, group: GroupId) -> Result<bool, LightControlError> {
        if !self
            .read_flag(&keys::group_disabled_at_night(group), false)
            .await?
        {
            return Ok(false);
        }
        self.programs.is_night(self.clock.now()).await
    }

    async fn is_on(&self, group: GroupId) -> Result<bool, LightControlError> {
        self.read_flag(&keys::group_on(group), false).await
    }

    async fn is_auto(&self, group: GroupId) -> Result<bool, LightControlError> {
        self.read_flag(&keys::group_auto(group), true).await
    }

    async fn read_flag(&self, key: &str, default: bool) -> Result<bool, LightControlError> {
        Ok(self
            .store
            .get(key)
            .await?
            .as_deref()
            .and_then(keys::decode_bool)
            .unwrap_or(default))
    }

    async fn stored_color(&self, group: GroupId) -> Result<Option<Color>, LightControlError> {
        Ok(self
            .store
            .get(&keys::group_color(group))
            .await?
            .and_then(|raw| raw.parse().ok()))
    }

    async fn stored_brightness(
        &self,
        group: GroupId,
        slot: BrightnessSlot,
    ) -> Result<Option<Brightness>, LightControlError> {
        self.read_brightness(&keys::group_brightness(group, slot))
            .await
    }

    async fn read_brightness(&self, key: &str) -> Result<Option<Brightness>, LightControlError> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(Brightness::clamped))
    }
}
