//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `lightcontrol.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use lightcontrol_adapter_mqtt::MqttConfig;
use lightcontrol_app::keys::decode_bool;
use lightcontrol_app::services::{
    CommandProcessorConfig, GroupSettings, SchedulerConfig, TimerConfig, TriggerRouterConfig,
};
use lightcontrol_domain::group::{DEFAULT_GROUP_COUNT, GroupId};

/// Largest group count a controller may be configured with.
const MAX_GROUP_COUNT: u8 = 32;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// State store settings.
    pub store: StoreConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Which light driver backs the command processor.
    pub driver: DriverConfig,
    /// Broker settings, used by the MQTT driver and bridge.
    pub mqtt: MqttConfig,
    /// Program scheduler settings.
    pub scheduler: SchedulerSection,
    /// Auto-off timer settings.
    pub timers: TimersConfig,
    /// Group count and per-group settings.
    pub groups: GroupsConfig,
    /// Sensor key to the group ids it lights.
    pub triggers: HashMap<String, Vec<u8>>,
}

/// State store configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Log everything from lightcontrol at debug level.
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Virtual,
    Mqtt,
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "virtual" => Ok(Self::Virtual),
            "mqtt" => Ok(Self::Mqtt),
            other => Err(ConfigError::Validation(format!(
                "unknown driver kind {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub kind: DriverKind,
}

/// Program scheduler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Seconds between two scheduler cycles.
    pub poll_interval_secs: u64,
    /// Overwrite stored program definitions with the defaults at startup.
    pub force_default_programs: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimersConfig {
    /// Auto-off delay when neither the request nor the store names one.
    pub default_length_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    /// Number of addressable groups.
    pub count: u8,
    /// Display names and night flags, written at startup.
    pub names: Vec<GroupEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupEntry {
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub disabled_at_night: Option<bool>,
}

impl Config {
    /// Load configuration from `lightcontrol.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("lightcontrol.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("LIGHTCONTROL_STORE_URL") {
            self.store.url = val;
        }
        if let Some(val) = lookup("LIGHTCONTROL_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(debug) = lookup("LIGHTCONTROL_DEBUG").as_deref().and_then(decode_bool) {
            self.logging.debug = debug;
        }
        if let Some(val) = lookup("LIGHTCONTROL_DRIVER") {
            self.driver.kind = val.parse()?;
        }
        if let Some(val) = lookup("LIGHTCONTROL_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(val) = lookup("LIGHTCONTROL_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let count = self.groups.count;
        if !(1..=MAX_GROUP_COUNT).contains(&count) {
            return Err(ConfigError::Validation(format!(
                "group count must be between 1 and {MAX_GROUP_COUNT}, got {count}"
            )));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler poll interval must be non-zero".to_string(),
            ));
        }
        for entry in &self.groups.names {
            group_id(entry.id, count)?;
        }
        for (sensor, ids) in &self.triggers {
            for id in ids {
                group_id(*id, count).map_err(|err| {
                    ConfigError::Validation(format!("trigger {sensor:?}: {err}"))
                })?;
            }
        }
        if self.driver.kind == DriverKind::Mqtt && !self.mqtt.enabled {
            return Err(ConfigError::Validation(
                "the mqtt driver requires mqtt.enabled = true".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the tracing filter directive, honouring the debug flag.
    #[must_use]
    pub fn log_filter(&self) -> String {
        if self.logging.debug {
            format!("{},lightcontrol=debug", self.logging.filter)
        } else {
            self.logging.filter.clone()
        }
    }

    /// Return the store URL in `sqlx`-compatible format.
    #[must_use]
    pub fn store_url(&self) -> &str {
        &self.store.url
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a group id is out of range.
    pub fn command_processor(&self) -> Result<CommandProcessorConfig, ConfigError> {
        let groups = self
            .groups
            .names
            .iter()
            .map(|entry| {
                Ok(GroupSettings {
                    id: group_id(entry.id, self.groups.count)?,
                    name: entry.name.clone(),
                    disabled_at_night: entry.disabled_at_night,
                })
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(CommandProcessorConfig {
            group_count: self.groups.count,
            groups,
        })
    }

    #[must_use]
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.scheduler.poll_interval_secs),
            force_default_programs: self.scheduler.force_default_programs,
        }
    }

    #[must_use]
    pub fn timers(&self) -> TimerConfig {
        TimerConfig {
            group_count: self.groups.count,
            default_length: Duration::from_secs(self.timers.default_length_secs),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a trigger names an unknown group.
    pub fn trigger_router(&self) -> Result<TriggerRouterConfig, ConfigError> {
        let routes = self
            .triggers
            .iter()
            .map(|(sensor, ids)| {
                let groups = ids
                    .iter()
                    .map(|id| group_id(*id, self.groups.count))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((sensor.clone(), groups))
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(TriggerRouterConfig { routes })
    }
}

fn group_id(id: u8, count: u8) -> Result<GroupId, ConfigError> {
    GroupId::new(id, count).map_err(|err| ConfigError::Validation(err.to_string()))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:lightcontrol.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lightcontrol=info,sqlx=warn".to_string(),
            debug: false,
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 20,
            force_default_programs: false,
        }
    }
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            default_length_secs: 120,
        }
    }
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_GROUP_COUNT,
            names: Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
