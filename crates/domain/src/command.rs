//! Command: a transient control message for one group or every group.
//!
//! Commands only exist on the control channel. They are decoded once at the
//! consumer boundary, turning the wire's string enums and `group: 0` sentinel
//! into typed values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DecodeError, LightControlError};
use crate::group::GroupTarget;
use crate::light::Color;

/// The operation a command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    On,
    Off,
    SetColor,
    SetBrightness,
    /// Force-reapply the persisted state to the driver.
    Sync,
    /// Pull the scheduler's current defaults into a lit group.
    ProgramSync,
    /// Sensor activity: switch on with the scheduler's defaults.
    AutoTriggered,
    /// Switch on in dim red.
    Night,
}

impl CommandKind {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::SetColor => "set_color",
            Self::SetBrightness => "set_brightness",
            Self::Sync => "sync",
            Self::ProgramSync => "program-sync",
            Self::AutoTriggered => "auto-triggered",
            Self::Night => "night",
        }
    }

    /// Commands that automation may not issue while a group is manually controlled.
    #[must_use]
    pub fn is_mode_gated(self) -> bool {
        matches!(self, Self::Off | Self::SetColor | Self::SetBrightness)
    }

    /// Commands that put a group under manual control when a person sends them.
    #[must_use]
    pub fn takes_manual_control(self) -> bool {
        matches!(
            self,
            Self::SetColor | Self::SetBrightness | Self::On | Self::Night | Self::AutoTriggered
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "set_color" => Ok(Self::SetColor),
            "set_brightness" => Ok(Self::SetBrightness),
            "sync" => Ok(Self::Sync),
            "program-sync" => Ok(Self::ProgramSync),
            "auto-triggered" => Ok(Self::AutoTriggered),
            "night" => Ok(Self::Night),
            other => Err(DecodeError::UnknownCommand(other.to_string())),
        }
    }
}

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A person, through a switch or UI.
    Manual,
    /// A sensor, relayed through the timer manager.
    Trigger,
    /// The program scheduler.
    Program,
}

impl Source {
    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Trigger => "trigger",
            Self::Program => "program",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "trigger" => Ok(Self::Trigger),
            "program" => Ok(Self::Program),
            other => Err(DecodeError::UnknownSource(other.to_string())),
        }
    }
}

/// A decoded control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub target: GroupTarget,
    pub source: Source,
    pub color: Option<Color>,
    /// Raw requested level; the snap rule is applied when it is used.
    pub brightness: Option<i64>,
}

/// Shape of a command on the control channel.
#[derive(Debug, Serialize, Deserialize)]
struct CommandMessage {
    command: String,
    group: u8,
    source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(
        default,
        deserialize_with = "numeric_level",
        skip_serializing_if = "Option::is_none"
    )]
    brightness: Option<i64>,
}

/// Accept integer or fractional levels, dropping the fraction.
#[allow(clippy::cast_possible_truncation)]
fn numeric_level<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(|level| level.trunc() as i64))
}

impl Command {
    #[must_use]
    pub fn new(kind: CommandKind, target: GroupTarget, source: Source) -> Self {
        Self {
            kind,
            target,
            source,
            color: None,
            brightness: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: i64) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Decode a control-channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`LightControlError::Decode`] for malformed JSON, unknown
    /// command or source names and empty colors, and
    /// [`LightControlError::Validation`] when the group is out of range.
    pub fn decode(payload: &str, group_count: u8) -> Result<Self, LightControlError> {
        let message: CommandMessage =
            serde_json::from_str(payload).map_err(DecodeError::from)?;
        let kind = message.command.parse::<CommandKind>()?;
        let source = message.source.parse::<Source>()?;
        let target = GroupTarget::decode(message.group, group_count)?;
        let color = message
            .color
            .as_deref()
            .map(str::parse::<Color>)
            .transpose()?;

        Ok(Self {
            kind,
            target,
            source,
            color,
            brightness: message.brightness,
        })
    }

    /// Encode for the control channel.
    #[must_use]
    pub fn to_payload(&self) -> String {
        let message = CommandMessage {
            command: self.kind.as_str().to_string(),
            group: self.target.to_wire(),
            source: self.source.as_str().to_string(),
            color: self.color.as_ref().map(|c| c.as_str().to_string()),
            brightness: self.brightness,
        };
        serde_json::to_string(&message).unwrap_or_default()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {} from {}", self.kind, self.target, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::group::GroupId;

    #[test]
    fn should_decode_manual_brightness_command() {
        let cmd = Command::decode(
            r#"{"command":"set_brightness","group":2,"source":"manual","brightness":40}"#,
            4,
        )
        .unwrap();
        assert_eq!(cmd.kind, CommandKind::SetBrightness);
        assert_eq!(cmd.target, GroupTarget::Single(GroupId::new(2, 4).unwrap()));
        assert_eq!(cmd.source, Source::Manual);
        assert_eq!(cmd.brightness, Some(40));
        assert_eq!(cmd.color, None);
    }

    #[test]
    fn should_truncate_fractional_brightness() {
        for (raw, expected) in [("40.0", 40), ("40.7", 40), ("-5.5", -5)] {
            let payload = format!(
                r#"{{"command":"set_brightness","group":1,"source":"manual","brightness":{raw}}}"#
            );
            let cmd = Command::decode(&payload, 4).unwrap();
            assert_eq!(cmd.brightness, Some(expected), "brightness {raw}");
        }
    }

    #[test]
    fn should_reject_non_numeric_brightness() {
        let err = Command::decode(
            r#"{"command":"set_brightness","group":1,"source":"manual","brightness":"high"}"#,
            4,
        )
        .unwrap_err();
        assert!(matches!(err, LightControlError::Decode(_)));
    }

    #[test]
    fn should_decode_group_zero_as_all() {
        let cmd = Command::decode(r#"{"command":"off","group":0,"source":"manual"}"#, 4).unwrap();
        assert_eq!(cmd.target, GroupTarget::All);
    }

    #[test]
    fn should_decode_hyphenated_commands() {
        let cmd =
            Command::decode(r#"{"command":"program-sync","group":0,"source":"program"}"#, 4)
                .unwrap();
        assert_eq!(cmd.kind, CommandKind::ProgramSync);
        assert_eq!(cmd.source, Source::Program);
    }

    #[test]
    fn should_report_unknown_command_by_name() {
        let err = Command::decode(r#"{"command":"dance","group":1,"source":"manual"}"#, 4)
            .unwrap_err();
        assert!(matches!(
            err,
            LightControlError::Decode(DecodeError::UnknownCommand(name)) if name == "dance"
        ));
    }

    #[test]
    fn should_report_malformed_json() {
        let err = Command::decode("not json", 4).unwrap_err();
        assert!(matches!(err, LightControlError::Decode(DecodeError::Json(_))));
    }

    #[test]
    fn should_report_missing_group_as_malformed() {
        let err = Command::decode(r#"{"command":"on","source":"manual"}"#, 4).unwrap_err();
        assert!(matches!(err, LightControlError::Decode(DecodeError::Json(_))));
    }

    #[test]
    fn should_reject_group_outside_range() {
        let err = Command::decode(r#"{"command":"on","group":9,"source":"manual"}"#, 4)
            .unwrap_err();
        assert!(matches!(
            err,
            LightControlError::Validation(ValidationError::GroupOutOfRange { id: 9, count: 4 })
        ));
    }

    #[test]
    fn should_reject_unknown_source() {
        let err = Command::decode(r#"{"command":"on","group":1,"source":"robot"}"#, 4)
            .unwrap_err();
        assert!(matches!(
            err,
            LightControlError::Decode(DecodeError::UnknownSource(_))
        ));
    }

    #[test]
    fn should_encode_wire_shape() {
        let cmd = Command::new(CommandKind::AutoTriggered, GroupTarget::All, Source::Trigger);
        let value: serde_json::Value = serde_json::from_str(&cmd.to_payload()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"command": "auto-triggered", "group": 0, "source": "trigger"})
        );
    }

    #[test]
    fn should_classify_mode_gated_and_manual_control_commands() {
        assert!(CommandKind::Off.is_mode_gated());
        assert!(!CommandKind::On.is_mode_gated());
        assert!(CommandKind::Night.takes_manual_control());
        assert!(!CommandKind::Off.takes_manual_control());
        assert!(!CommandKind::ProgramSync.takes_manual_control());
    }
}
