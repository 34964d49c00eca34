//! Light state values: colors and brightness.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Raw levels below this snap to fully off.
pub const LOW_SNAP_THRESHOLD: i64 = 5;

/// Raw levels above this snap to full brightness.
pub const HIGH_SNAP_THRESHOLD: i64 = 95;

/// Color a group is showing: plain white or a named driver color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    #[default]
    White,
    /// Any driver color other than white (e.g. `red`, `blue`).
    Named(String),
}

impl Color {
    /// The night-time color.
    #[must_use]
    pub fn red() -> Self {
        Self::Named("red".to_string())
    }

    /// Wire / storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::White => "white",
            Self::Named(name) => name,
        }
    }

    /// Which brightness slot is active while this color is shown.
    #[must_use]
    pub fn slot(&self) -> BrightnessSlot {
        match self {
            Self::White => BrightnessSlot::White,
            Self::Named(_) => BrightnessSlot::Rgb,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "" => Err(DecodeError::EmptyColor),
            "white" => Ok(Self::White),
            _ => Ok(Self::Named(name)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.as_str().to_string()
    }
}

/// A brightness level in `0..=100` that has passed the snap rule.
///
/// Levels near the ends of the range snap to `0` or `100` so that ramps do
/// not leave lamps flickering just above off or just below full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brightness(u8);

impl Brightness {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(100);

    /// Apply the snap rule to a raw level.
    #[must_use]
    pub fn clamped(raw: i64) -> Self {
        if raw < LOW_SNAP_THRESHOLD {
            Self::OFF
        } else if raw > HIGH_SNAP_THRESHOLD {
            Self::FULL
        } else {
            u8::try_from(raw).map_or(Self::FULL, Self)
        }
    }

    /// The level as a percentage.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Groups remember one brightness for white and one for colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrightnessSlot {
    White,
    Rgb,
}

impl BrightnessSlot {
    /// Attribute name used in state keys.
    #[must_use]
    pub fn attribute(self) -> &'static str {
        match self {
            Self::White => "white_brightness",
            Self::Rgb => "rgb_brightness",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_white_case_insensitively() {
        assert_eq!("White".parse::<Color>().unwrap(), Color::White);
    }

    #[test]
    fn should_parse_other_names_as_named_colors() {
        assert_eq!(
            "red".parse::<Color>().unwrap(),
            Color::Named("red".to_string())
        );
        assert_eq!(Color::red().as_str(), "red");
    }

    #[test]
    fn should_reject_empty_color() {
        assert!(matches!(
            "  ".parse::<Color>(),
            Err(DecodeError::EmptyColor)
        ));
    }

    #[test]
    fn should_select_slot_from_color() {
        assert_eq!(Color::White.slot(), BrightnessSlot::White);
        assert_eq!(Color::red().slot(), BrightnessSlot::Rgb);
        assert_eq!(BrightnessSlot::Rgb.attribute(), "rgb_brightness");
    }

    #[test]
    fn should_snap_low_levels_to_off() {
        assert_eq!(Brightness::clamped(4), Brightness::OFF);
        assert_eq!(Brightness::clamped(-20), Brightness::OFF);
        assert_eq!(Brightness::clamped(5).get(), 5);
    }

    #[test]
    fn should_snap_high_levels_to_full() {
        assert_eq!(Brightness::clamped(96), Brightness::FULL);
        assert_eq!(Brightness::clamped(250), Brightness::FULL);
        assert_eq!(Brightness::clamped(95).get(), 95);
    }

    #[test]
    fn should_serialize_color_as_plain_string() {
        let json = serde_json::to_string(&Color::red()).unwrap();
        assert_eq!(json, "\"red\"");
        let back: Color = serde_json::from_str("\"white\"").unwrap();
        assert_eq!(back, Color::White);
    }
}
