//! Light driver port: the physical capability behind each group.
//!
//! Drivers are fire-and-forget: callers only learn whether the request was
//! accepted. There is no timeout or retry at this level.

use std::future::Future;

use lightcontrol_domain::error::LightControlError;
use lightcontrol_domain::group::GroupId;
use lightcontrol_domain::light::{Brightness, Color};

/// Drives one group of lamps.
pub trait LightDriver {
    fn turn_on(&self, group: GroupId) -> impl Future<Output = Result<(), LightControlError>> + Send;

    fn turn_off(&self, group: GroupId)
    -> impl Future<Output = Result<(), LightControlError>> + Send;

    fn set_color(
        &self,
        color: &Color,
        group: GroupId,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send;

    /// Set the level of whichever brightness slot the group's color uses.
    fn set_brightness(
        &self,
        level: Brightness,
        group: GroupId,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send;
}

impl<T: LightDriver + Send + Sync> LightDriver for std::sync::Arc<T> {
    fn turn_on(&self, group: GroupId) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).turn_on(group)
    }

    fn turn_off(
        &self,
        group: GroupId,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).turn_off(group)
    }

    fn set_color(
        &self,
        color: &Color,
        group: GroupId,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).set_color(color, group)
    }

    fn set_brightness(
        &self,
        level: Brightness,
        group: GroupId,
    ) -> impl Future<Output = Result<(), LightControlError>> + Send {
        (**self).set_brightness(level, group)
    }
}
