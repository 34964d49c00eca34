//! Program book: reads the stored light programs and answers day/night questions.

use chrono::Datelike;

use lightcontrol_domain::error::LightControlError;
use lightcontrol_domain::program::{
    DayPrograms, LightProgram, Period, ProgramSettings, TimeOfDay, periods_for,
};
use lightcontrol_domain::time::LocalTimestamp;

use crate::keys;
use crate::ports::StateStore;

/// Read-only view of the programs in the store.
///
/// Missing or malformed definitions fall back to the built-in defaults, so
/// lookups only fail when the store itself does.
#[derive(Debug, Clone)]
pub struct ProgramBook<S> {
    store: S,
}

impl<S: StateStore> ProgramBook<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load one program.
    ///
    /// # Errors
    ///
    /// Returns a store error if the definition cannot be read.
    pub async fn program(
        &self,
        time_of_day: TimeOfDay,
        period: Period,
    ) -> Result<LightProgram, LightControlError> {
        let key = keys::program(time_of_day, period);
        let Some(raw) = self.store.get(&key).await? else {
            tracing::debug!(%key, "program not stored, using default");
            return Ok(LightProgram::default_for(time_of_day, period));
        };
        match ProgramSettings::from_json(&raw) {
            Ok(settings) => Ok(LightProgram::new(time_of_day, period, settings)),
            Err(err) => {
                tracing::warn!(%err, %key, "malformed program definition, using default");
                Ok(LightProgram::default_for(time_of_day, period))
            }
        }
    }

    /// The morning and evening program for the day `now` falls on.
    ///
    /// # Errors
    ///
    /// Returns a store error if a definition cannot be read.
    pub async fn day_programs(&self, now: LocalTimestamp) -> Result<DayPrograms, LightControlError> {
        let (morning_period, evening_period) = periods_for(now.weekday());
        Ok(DayPrograms {
            morning: self.program(TimeOfDay::Morning, morning_period).await?,
            evening: self.program(TimeOfDay::Evening, evening_period).await?,
        })
    }

    /// # Errors
    ///
    /// Returns a store error if a definition cannot be read.
    pub async fn is_day(&self, now: LocalTimestamp) -> Result<bool, LightControlError> {
        Ok(self.day_programs(now).await?.is_day(now))
    }

    /// # Errors
    ///
    /// Returns a store error if a definition cannot be read.
    pub async fn is_night(&self, now: LocalTimestamp) -> Result<bool, LightControlError> {
        Ok(!self.is_day(now).await?)
    }

    /// The program whose window `now` lies in, morning first.
    ///
    /// # Errors
    ///
    /// Returns a store error if a definition cannot be read.
    pub async fn get_running_program(
        &self,
        now: LocalTimestamp,
    ) -> Result<Option<LightProgram>, LightControlError> {
        Ok(self.day_programs(now).await?.running(now).cloned())
    }

    /// Whether the program's enabled flag is set; an absent flag means disabled.
    ///
    /// # Errors
    ///
    /// Returns a store error if the flag cannot be read.
    pub async fn is_enabled(&self, program: &LightProgram) -> Result<bool, LightControlError> {
        let key = keys::program_enabled(program.time_of_day, program.period);
        Ok(self
            .store
            .get(&key)
            .await?
            .as_deref()
            .and_then(keys::decode_bool)
            .unwrap_or(false))
    }
}
