//! Time and timestamp helpers.
//!
//! Programs are defined in wall-clock local time, so scheduling works on
//! naive local timestamps rather than UTC.

use chrono::{Local, NaiveDateTime};

/// Naive local timestamp used for program windows and day/night decisions.
pub type LocalTimestamp = NaiveDateTime;

/// Return the current local wall-clock time.
#[must_use]
pub fn now() -> LocalTimestamp {
    Local::now().naive_local()
}

/// Format a timestamp the way program next-start/next-end keys store it.
#[must_use]
pub fn to_iso(ts: LocalTimestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}
