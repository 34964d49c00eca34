//! Messages exchanged between services besides control commands.
//!
//! - [`TimerStart`]: "start (or extend) the auto-off timer for a group"
//! - [`TriggerEvent`]: "a sensor saw activity"
//! - [`StateBroadcast`]: a snapshot of one group for downstream observers

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, LightControlError};
use crate::group::GroupTarget;

/// Request to arm an auto-off timer.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerStart {
    pub target: GroupTarget,
    /// Timer length; `None` means "use the current default length".
    pub duration: Option<Duration>,
    /// Replace a pending timer even if it would expire later.
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TimerStartMessage {
    group: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default)]
    force: bool,
}

impl TimerStart {
    /// Decode a timer-channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`LightControlError::Decode`] for malformed JSON or a duration
    /// that is negative, not finite or longer than [`MAX_TIMER_LENGTH`], and
    /// [`LightControlError::Validation`] when the group is out of range.
    pub fn decode(payload: &str, group_count: u8) -> Result<Self, LightControlError> {
        let message: TimerStartMessage =
            serde_json::from_str(payload).map_err(DecodeError::from)?;
        let target = GroupTarget::decode(message.group, group_count)?;
        let duration = message.duration.map(seconds_to_duration).transpose()?;
        Ok(Self {
            target,
            duration,
            force: message.force,
        })
    }

    /// Encode for the timer channel.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let message = TimerStartMessage {
            group: self.target.to_wire(),
            duration: self.duration.map(|d| d.as_secs_f64()),
            force: self.force,
        };
        serde_json::to_string(&message).unwrap_or_default()
    }
}

/// Longest timer a request may ask for.
pub const MAX_TIMER_LENGTH: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Convert a wire duration in seconds, rejecting negative, non-finite and
/// over-long values.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidDuration`] when `seconds` cannot be a timer length.
pub fn seconds_to_duration(seconds: f64) -> Result<Duration, DecodeError> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|length| *length <= MAX_TIMER_LENGTH)
        .ok_or(DecodeError::InvalidDuration(seconds))
}

/// Sensor activity reported on the triggers channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Sensor name; absent keys are reported by the router.
    #[serde(default)]
    pub key: Option<String>,
}

impl TriggerEvent {
    /// Decode a triggers-channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Json`] when the payload is not a JSON object.
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Recomputed view of one group, as observers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub on: bool,
    pub name: Option<String>,
    pub color: Option<String>,
    pub current_brightness: Option<u8>,
    pub id: u8,
}

/// Envelope published on the state-broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBroadcast {
    pub key: String,
    pub content: BroadcastContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastContent {
    pub groups: Vec<GroupView>,
}

impl StateBroadcast {
    /// Key identifying lightcontrol broadcasts on the shared channel.
    pub const KEY: &'static str = "lightcontrol";

    #[must_use]
    pub fn for_group(view: GroupView) -> Self {
        Self {
            key: Self::KEY.to_string(),
            content: BroadcastContent { groups: vec![view] },
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
