//! Names of every channel and key the services share.
//!
//! Values are stored as plain strings. Booleans are written as `true` /
//! `false`; [`decode_bool`] also accepts the capitalised forms older writers
//! used.

use lightcontrol_domain::group::GroupId;
use lightcontrol_domain::light::BrightnessSlot;
use lightcontrol_domain::program::{Period, TimeOfDay};

/// Publish/subscribe channel names.
pub mod channels {
    /// Control commands consumed by the command processor.
    pub const CONTROL: &str = "lightcontrol-control-pubsub";
    /// Timer-start requests consumed by the timer manager.
    pub const TIMER: &str = "lightcontrol-timer-pubsub";
    /// Sensor events consumed by the trigger router.
    pub const TRIGGERS: &str = "lightcontrol-triggers-pubsub";
    /// Group state snapshots for observers.
    pub const BROADCAST: &str = "home:broadcast:generic";
}

/// Color the scheduler wants lit groups to show.
pub const DEFAULT_COLOR: &str = "lightcontrol-default-color";
/// Brightness the scheduler wants lit groups to show.
pub const DEFAULT_BRIGHTNESS: &str = "lightcontrol-default-brightness";
/// Auto-off timer length in seconds when a request names none.
pub const TIMER_LENGTH: &str = "lightcontrol-timer-length";

fn group_state(group: GroupId, attribute: &str) -> String {
    format!("lightcontrol-state-{group}-{attribute}")
}

#[must_use]
pub fn group_on(group: GroupId) -> String {
    group_state(group, "on")
}

#[must_use]
pub fn group_color(group: GroupId) -> String {
    group_state(group, "color")
}

#[must_use]
pub fn group_brightness(group: GroupId, slot: BrightnessSlot) -> String {
    group_state(group, slot.attribute())
}

#[must_use]
pub fn group_auto(group: GroupId) -> String {
    group_state(group, "auto")
}

#[must_use]
pub fn group_user_override(group: GroupId) -> String {
    group_state(group, "user-override")
}

#[must_use]
pub fn group_name(group: GroupId) -> String {
    format!("lightcontrol-group-{group}-name")
}

#[must_use]
pub fn group_disabled_at_night(group: GroupId) -> String {
    format!("lightcontrol-group-{group}-disabled-night")
}

/// Stored program definition.
#[must_use]
pub fn program(time_of_day: TimeOfDay, period: Period) -> String {
    format!("lightcontrol-program-{time_of_day}-{period}")
}

#[must_use]
pub fn program_next_start(time_of_day: TimeOfDay, period: Period) -> String {
    format!("{}-next_start_at", program(time_of_day, period))
}

#[must_use]
pub fn program_next_end(time_of_day: TimeOfDay, period: Period) -> String {
    format!("{}-next_end_at", program(time_of_day, period))
}

/// Whether the program may run at all.
#[must_use]
pub fn program_enabled(time_of_day: TimeOfDay, period: Period) -> String {
    format!("lightprogram-{time_of_day}-{period}-running")
}

/// One-shot marker for morning programs; note the period comes first.
#[must_use]
pub fn program_triggered(time_of_day: TimeOfDay, period: Period) -> String {
    format!("lightprogram-{period}-{time_of_day}-triggered")
}

#[must_use]
pub fn encode_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Parse a stored boolean; `None` for anything unrecognised.
#[must_use]
pub fn decode_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "True" | "1" => Some(true),
        "false" | "False" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: u8) -> GroupId {
        GroupId::new(id, 4).unwrap()
    }

    #[test]
    fn should_name_group_state_keys() {
        assert_eq!(group_on(group(2)), "lightcontrol-state-2-on");
        assert_eq!(
            group_brightness(group(2), BrightnessSlot::Rgb),
            "lightcontrol-state-2-rgb_brightness"
        );
        assert_eq!(group_user_override(group(1)), "lightcontrol-state-1-user-override");
        assert_eq!(
            group_disabled_at_night(group(3)),
            "lightcontrol-group-3-disabled-night"
        );
    }

    #[test]
    fn should_name_program_keys() {
        assert_eq!(
            program_next_start(TimeOfDay::Morning, Period::Weekday),
            "lightcontrol-program-morning-weekday-next_start_at"
        );
        assert_eq!(
            program_enabled(TimeOfDay::Evening, Period::Weekend),
            "lightprogram-evening-weekend-running"
        );
        assert_eq!(
            program_triggered(TimeOfDay::Morning, Period::Weekend),
            "lightprogram-weekend-morning-triggered"
        );
    }

    #[test]
    fn should_decode_booleans_leniently() {
        assert_eq!(decode_bool("True"), Some(true));
        assert_eq!(decode_bool(encode_bool(false)), Some(false));
        assert_eq!(decode_bool("maybe"), None);
    }
}
