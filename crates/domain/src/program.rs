//! Light programs: recurring morning/evening windows.
//!
//! A program starts at a wall-clock time and lasts a fixed number of seconds.
//! There are exactly four of them: morning and evening, each in a weekday and
//! a weekend variant. Which variant applies on a given day is asymmetric
//! because evening windows run towards (and past) midnight: Friday and
//! Saturday evenings precede a day off, Sunday evening precedes a work day.
//!
//! All scheduling here is a pure function of `(program, now)`.

use std::fmt;

use chrono::{Datelike, NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, LightControlError, ValidationError};
use crate::time::LocalTimestamp;

/// Which kind of day a program belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Weekday,
    Weekend,
}

impl Period {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::Weekend => "weekend",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of the day a program covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    Morning,
    Evening,
}

impl TimeOfDay {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four programs, in the order their timestamps are refreshed.
pub const CANONICAL_PROGRAMS: [(TimeOfDay, Period); 4] = [
    (TimeOfDay::Morning, Period::Weekend),
    (TimeOfDay::Evening, Period::Weekend),
    (TimeOfDay::Morning, Period::Weekday),
    (TimeOfDay::Evening, Period::Weekday),
];

/// Mutable, stored part of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSettings {
    #[serde(with = "hhmm")]
    pub start_at: NaiveTime,
    /// Length of the window in seconds.
    pub duration: u32,
    /// Default brightness while the program runs, if it sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

impl ProgramSettings {
    /// Parse a stored program definition.
    ///
    /// # Errors
    ///
    /// Returns [`LightControlError::Decode`] for malformed JSON (including a
    /// start time that is not `HH:MM`) and [`ValidationError::ZeroDuration`]
    /// for an empty window.
    pub fn from_json(payload: &str) -> Result<Self, LightControlError> {
        let settings: Self = serde_json::from_str(payload).map_err(DecodeError::from)?;
        if settings.duration == 0 {
            return Err(ValidationError::ZeroDuration.into());
        }
        Ok(settings)
    }

    /// Stored representation.
    #[must_use]
    pub fn dump(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A program bound to its slot in the week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightProgram {
    pub time_of_day: TimeOfDay,
    pub period: Period,
    pub settings: ProgramSettings,
}

impl LightProgram {
    #[must_use]
    pub fn new(time_of_day: TimeOfDay, period: Period, settings: ProgramSettings) -> Self {
        Self {
            time_of_day,
            period,
            settings,
        }
    }

    /// The built-in definition used when nothing is stored.
    #[must_use]
    pub fn default_for(time_of_day: TimeOfDay, period: Period) -> Self {
        let (hour, minute, duration, brightness) = match (time_of_day, period) {
            (TimeOfDay::Morning, Period::Weekday) => (8, 15, 3600, Some(100)),
            (TimeOfDay::Morning, Period::Weekend) => (9, 30, 3600, Some(100)),
            (TimeOfDay::Evening, Period::Weekday) => (22, 30, 1800, None),
            (TimeOfDay::Evening, Period::Weekend) => (23, 0, 1800, None),
        };
        let start_at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
        Self::new(
            time_of_day,
            period,
            ProgramSettings {
                start_at,
                duration,
                brightness,
            },
        )
    }

    /// Smallest number of days (0..=6) from `current_day` to any of
    /// `dest_days`, with Monday as `0`.
    #[must_use]
    pub fn calc_days_to(current_day: u32, dest_days: &[u32]) -> u32 {
        (0..7)
            .find(|offset| dest_days.contains(&((current_day + offset) % 7)))
            .unwrap_or(0)
    }

    /// Weekdays (Monday = `0`) on which this program's window may start.
    #[must_use]
    pub fn valid_weekdays(&self) -> &'static [u32] {
        match (self.time_of_day, self.period) {
            (TimeOfDay::Morning, Period::Weekend) => &[5, 6],
            (TimeOfDay::Morning, Period::Weekday) => &[0, 1, 2, 3, 4],
            (TimeOfDay::Evening, Period::Weekend) => &[4, 5],
            (TimeOfDay::Evening, Period::Weekday) => &[0, 1, 2, 3, 6],
        }
    }

    /// Start and end of the program's window relative to `now`.
    ///
    /// Without `advance` this is today's window. With `advance` it is the
    /// next occurrence that has not finished yet: when today's window is
    /// over the search starts tomorrow, then it moves forward to the first
    /// day the program is valid on.
    #[must_use]
    pub fn window(&self, now: LocalTimestamp, advance: bool) -> (LocalTimestamp, LocalTimestamp) {
        let start = now.date().and_time(self.settings.start_at);
        let end = start + TimeDelta::seconds(i64::from(self.settings.duration));
        if !advance {
            return (start, end);
        }

        let finished = now > end;
        let skip = u32::from(finished);
        let weekday = (now.weekday().num_days_from_monday() + skip) % 7;
        let plus_days = Self::calc_days_to(weekday, self.valid_weekdays()) + skip;
        let offset = TimeDelta::days(i64::from(plus_days));
        (start + offset, end + offset)
    }

    #[must_use]
    pub fn start_datetime(&self, now: LocalTimestamp, advance: bool) -> LocalTimestamp {
        self.window(now, advance).0
    }

    #[must_use]
    pub fn end_datetime(&self, now: LocalTimestamp, advance: bool) -> LocalTimestamp {
        self.window(now, advance).1
    }

    /// Fraction of the window elapsed at `now`, or `None` outside it.
    #[must_use]
    pub fn percent_done(&self, now: LocalTimestamp) -> Option<f64> {
        let (start, end) = self.window(now, true);
        if start > now || now > end {
            return None;
        }
        let elapsed = (now - start).to_std().ok()?.as_secs_f64();
        Some(elapsed / f64::from(self.settings.duration))
    }

    /// Whether `now` lies strictly inside the next window.
    #[must_use]
    pub fn is_running(&self, now: LocalTimestamp) -> bool {
        let (start, end) = self.window(now, true);
        start < now && now < end
    }

    /// Display name, e.g. `morning-weekday`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}-{}", self.time_of_day, self.period)
    }
}

impl fmt::Display for LightProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}+{}s",
            self.name(),
            self.settings.start_at.format("%H:%M"),
            self.settings.duration
        )?;
        if let Some(brightness) = self.settings.brightness {
            write!(f, ", brightness={brightness}")?;
        }
        f.write_str(")")
    }
}

/// Parse a program start time written as `HH:MM`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidStartTime`] for anything else.
pub fn parse_start_at(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidStartTime(raw.to_string()))
}

/// Morning and evening periods in effect on `weekday`.
#[must_use]
pub fn periods_for(weekday: Weekday) -> (Period, Period) {
    match weekday {
        Weekday::Fri => (Period::Weekday, Period::Weekend),
        Weekday::Sat => (Period::Weekend, Period::Weekend),
        Weekday::Sun => (Period::Weekend, Period::Weekday),
        _ => (Period::Weekday, Period::Weekday),
    }
}

/// The morning and evening program that apply to one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPrograms {
    pub morning: LightProgram,
    pub evening: LightProgram,
}

impl DayPrograms {
    /// Day runs from the start of today's morning window to the end of
    /// today's evening window, both inclusive.
    #[must_use]
    pub fn is_day(&self, now: LocalTimestamp) -> bool {
        let morning_start = self.morning.start_datetime(now, false);
        let evening_end = self.evening.end_datetime(now, false);
        !(now > evening_end || now < morning_start)
    }

    #[must_use]
    pub fn is_night(&self, now: LocalTimestamp) -> bool {
        !self.is_day(now)
    }

    /// The running program, checking the morning first.
    #[must_use]
    pub fn running(&self, now: LocalTimestamp) -> Option<&LightProgram> {
        [&self.morning, &self.evening]
            .into_iter()
            .find(|program| program.is_running(now))
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_start_at(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, micro: u32) -> LocalTimestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_micro_opt(h, min, s, micro)
            .unwrap()
    }

    fn morning_weekday() -> LightProgram {
        LightProgram::default_for(TimeOfDay::Morning, Period::Weekday)
    }

    fn weekday_programs() -> DayPrograms {
        DayPrograms {
            morning: morning_weekday(),
            evening: LightProgram::default_for(TimeOfDay::Evening, Period::Weekday),
        }
    }

    #[test]
    fn should_compute_percent_done_inside_window() {
        let done = morning_weekday()
            .percent_done(at(2016, 3, 30, 8, 34, 5, 690_085))
            .unwrap();
        assert!((done - 0.318_247_245_833).abs() < 1e-9);
    }

    #[test]
    fn should_return_none_for_percent_done_outside_window() {
        let program = morning_weekday();
        assert_eq!(program.percent_done(at(2016, 3, 30, 9, 34, 5, 690_085)), None);
        assert_eq!(program.percent_done(at(2016, 3, 30, 6, 34, 5, 690_085)), None);
    }

    #[test]
    fn should_calculate_days_to_destination() {
        assert_eq!(LightProgram::calc_days_to(6, &[0]), 1);
        assert_eq!(LightProgram::calc_days_to(5, &[0, 1]), 2);
        assert_eq!(LightProgram::calc_days_to(0, &[5, 6]), 5);
        assert_eq!(LightProgram::calc_days_to(2, &[0, 1, 2, 3, 4]), 0);
    }

    #[test]
    fn should_keep_todays_window_while_running() {
        let (start, end) = morning_weekday().window(at(2016, 3, 28, 8, 34, 5, 0), true);
        assert_eq!(start, at(2016, 3, 28, 8, 15, 0, 0));
        assert_eq!(end, at(2016, 3, 28, 9, 15, 0, 0));
    }

    #[test]
    fn should_advance_to_tomorrow_when_window_is_over() {
        let (start, end) = morning_weekday().window(at(2016, 3, 28, 9, 34, 5, 0), true);
        assert_eq!(start, at(2016, 3, 29, 8, 15, 0, 0));
        assert_eq!(end, at(2016, 3, 29, 9, 15, 0, 0));
    }

    #[test]
    fn should_wrap_weekday_program_over_weekend() {
        // Saturday morning, after the window: next weekday morning is Monday.
        let end = morning_weekday().end_datetime(at(2016, 4, 2, 10, 0, 0, 0), true);
        assert_eq!(end, at(2016, 4, 4, 9, 15, 0, 0));
    }

    #[test]
    fn should_not_advance_when_not_requested() {
        let start = morning_weekday().start_datetime(at(2016, 4, 2, 10, 0, 0, 0), false);
        assert_eq!(start, at(2016, 4, 2, 8, 15, 0, 0));
    }

    #[test]
    fn should_skip_friday_for_weekday_evening() {
        // Friday evening belongs to the weekend; the weekday evening moves to Sunday.
        let program = LightProgram::default_for(TimeOfDay::Evening, Period::Weekday);
        let start = program.start_datetime(at(2016, 4, 1, 20, 0, 0, 0), true);
        assert_eq!(start, at(2016, 4, 3, 22, 30, 0, 0));
    }

    #[test]
    fn should_find_weekend_evening_on_friday() {
        let program = LightProgram::default_for(TimeOfDay::Evening, Period::Weekend);
        let start = program.start_datetime(at(2016, 4, 1, 20, 0, 0, 0), true);
        assert_eq!(start, at(2016, 4, 1, 23, 0, 0, 0));
    }

    #[test]
    fn should_select_periods_per_weekday() {
        assert_eq!(periods_for(Weekday::Mon), (Period::Weekday, Period::Weekday));
        assert_eq!(periods_for(Weekday::Fri), (Period::Weekday, Period::Weekend));
        assert_eq!(periods_for(Weekday::Sat), (Period::Weekend, Period::Weekend));
        assert_eq!(periods_for(Weekday::Sun), (Period::Weekend, Period::Weekday));
    }

    #[test]
    fn should_tell_day_from_night() {
        let programs = weekday_programs();
        assert!(programs.is_day(at(2016, 3, 30, 8, 34, 5, 690_085)));
        assert!(programs.is_night(at(2016, 3, 30, 7, 34, 5, 690_085)));
        assert!(programs.is_day(at(2016, 3, 30, 16, 34, 5, 690_085)));
        assert!(programs.is_night(at(2016, 3, 30, 23, 0, 5, 690_085)));
        assert!(programs.is_night(at(2016, 3, 30, 1, 0, 5, 690_085)));
    }

    #[test]
    fn should_keep_day_and_night_exclusive_across_a_whole_day() {
        let programs = weekday_programs();
        for minute in 0..(24 * 60) {
            let now = at(2016, 3, 30, minute / 60, minute % 60, 0, 0);
            assert_ne!(programs.is_day(now), programs.is_night(now));
        }
    }

    #[test]
    fn should_report_running_morning_program() {
        let programs = weekday_programs();
        let running = programs.running(at(2016, 3, 30, 8, 34, 5, 690_085)).unwrap();
        assert_eq!(running.time_of_day, TimeOfDay::Morning);
        assert_eq!(running.period, Period::Weekday);
    }

    #[test]
    fn should_report_no_program_between_windows() {
        let programs = weekday_programs();
        assert!(programs.running(at(2016, 3, 30, 9, 34, 5, 690_085)).is_none());
    }

    #[test]
    fn should_treat_window_bounds_as_not_running() {
        let program = morning_weekday();
        assert!(!program.is_running(at(2016, 3, 30, 8, 15, 0, 0)));
        assert!(program.is_running(at(2016, 3, 30, 8, 15, 1, 0)));
    }

    #[test]
    fn should_parse_stored_settings() {
        let settings =
            ProgramSettings::from_json(r#"{"start_at":"08:15","duration":3600,"brightness":100}"#)
                .unwrap();
        assert_eq!(settings, morning_weekday().settings);
    }

    #[test]
    fn should_dump_settings_in_stored_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&morning_weekday().settings.dump()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"start_at": "08:15", "duration": 3600, "brightness": 100})
        );
    }

    #[test]
    fn should_reject_zero_duration_settings() {
        let err = ProgramSettings::from_json(r#"{"start_at":"08:15","duration":0}"#).unwrap_err();
        assert!(matches!(
            err,
            LightControlError::Validation(ValidationError::ZeroDuration)
        ));
    }

    #[test]
    fn should_report_unparseable_start_time() {
        assert_eq!(
            parse_start_at("25:99"),
            Err(ValidationError::InvalidStartTime("25:99".to_string()))
        );
        assert_eq!(
            parse_start_at("07:05").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 0).unwrap()
        );
    }

    #[test]
    fn should_reject_malformed_start_time() {
        assert!(ProgramSettings::from_json(r#"{"start_at":"quarter past","duration":60}"#).is_err());
    }
}
