//! Topic layout under the configured base topic.

use lightcontrol_app::keys::channels;
use lightcontrol_domain::group::GroupId;

/// Topic names derived from one base prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Where the driver sends commands for one group.
    #[must_use]
    pub fn group_set(&self, group: GroupId) -> String {
        format!("{}/group/{group}/set", self.base)
    }

    /// Where state broadcasts are mirrored to.
    #[must_use]
    pub fn state(&self) -> String {
        format!("{}/state", self.base)
    }

    /// Inbound topics and the store channel each one feeds.
    #[must_use]
    pub fn inbound(&self) -> [(String, &'static str); 3] {
        [
            (format!("{}/control", self.base), channels::CONTROL),
            (format!("{}/timer", self.base), channels::TIMER),
            (format!("{}/trigger", self.base), channels::TRIGGERS),
        ]
    }

    /// Store channel for an inbound topic, if it is one.
    #[must_use]
    pub fn channel_for(&self, topic: &str) -> Option<&'static str> {
        let suffix = topic.strip_prefix(&self.base)?.strip_prefix('/')?;
        match suffix {
            "control" => Some(channels::CONTROL),
            "timer" => Some(channels::TIMER),
            "trigger" => Some(channels::TRIGGERS),
            _ => None,
        }
    }
}
