//! # lightcontrol-adapter-virtual
//!
//! Virtual light driver that simulates one lamp per group, for testing and
//! demonstration without a physical controller.
//!
//! Every call is logged and reflected in an in-memory [`LampState`] that
//! tests and the daemon's debug output can inspect.
//!
//! ## Dependency rule
//!
//! Depends on `lightcontrol-app` (port traits) and `lightcontrol-domain` only.

mod lamp;

use std::collections::BTreeMap;

use lightcontrol_app::ports::LightDriver;
use lightcontrol_domain::error::{LightControlError, ValidationError};
use lightcontrol_domain::group::GroupId;
use lightcontrol_domain::light::{Brightness, Color};

pub use lamp::{LampState, VirtualLamp};

/// Simulated driver for `group_count` groups.
#[derive(Debug)]
pub struct VirtualLightDriver {
    group_count: u8,
    lamps: BTreeMap<GroupId, VirtualLamp>,
}

impl VirtualLightDriver {
    #[must_use]
    pub fn new(group_count: u8) -> Self {
        let lamps = GroupId::all(group_count)
            .map(|id| (id, VirtualLamp::default()))
            .collect();
        Self { group_count, lamps }
    }

    /// Current state of one group's lamp.
    #[must_use]
    pub fn snapshot(&self, group: GroupId) -> Option<LampState> {
        self.lamps.get(&group).map(VirtualLamp::snapshot)
    }

    /// Current state of every lamp, ordered by group.
    #[must_use]
    pub fn snapshots(&self) -> Vec<(GroupId, LampState)> {
        self.lamps
            .iter()
            .map(|(id, lamp)| (*id, lamp.snapshot()))
            .collect()
    }

    fn lamp(&self, group: GroupId) -> Result<&VirtualLamp, LightControlError> {
        self.lamps.get(&group).ok_or_else(|| {
            ValidationError::GroupOutOfRange {
                id: group.get(),
                count: self.group_count,
            }
            .into()
        })
    }
}

impl LightDriver for VirtualLightDriver {
    async fn turn_on(&self, group: GroupId) -> Result<(), LightControlError> {
        self.lamp(group)?.switch(true);
        tracing::info!(%group, "virtual lamp on");
        Ok(())
    }

    async fn turn_off(&self, group: GroupId) -> Result<(), LightControlError> {
        self.lamp(group)?.switch(false);
        tracing::info!(%group, "virtual lamp off");
        Ok(())
    }

    async fn set_color(&self, color: &Color, group: GroupId) -> Result<(), LightControlError> {
        self.lamp(group)?.paint(color);
        tracing::info!(%group, %color, "virtual lamp color");
        Ok(())
    }

    async fn set_brightness(
        &self,
        level: Brightness,
        group: GroupId,
    ) -> Result<(), LightControlError> {
        self.lamp(group)?.dim(level);
        tracing::info!(%group, %level, "virtual lamp brightness");
        Ok(())
    }
}
