//! Program scheduler: turns the clock into default colors, brightness ramps
//! and morning wake-up timers.
//!
//! Every cycle the scheduler refreshes the next-start/next-end timestamps of
//! all four programs, finds the running one and executes it. With nothing
//! running it publishes plain day or night defaults instead. It never touches
//! a group directly: lit groups pick the defaults up through `program-sync`
//! and `auto-triggered` commands handled by the command processor.

use std::time::Duration;

use lightcontrol_domain::command::{Command, CommandKind, Source};
use lightcontrol_domain::error::LightControlError;
use lightcontrol_domain::group::GroupTarget;
use lightcontrol_domain::light::{Brightness, Color};
use lightcontrol_domain::message::TimerStart;
use lightcontrol_domain::program::{CANONICAL_PROGRAMS, LightProgram, TimeOfDay};
use lightcontrol_domain::time::{LocalTimestamp, to_iso};

use crate::keys::{self, channels};
use crate::ports::{Clock, StateStore};
use crate::services::program_book::ProgramBook;

/// Auto-off timer length while it is day and no program runs.
pub const DAY_TIMER_LENGTH_SECS: u64 = 15 * 60;

/// Auto-off timer length while it is night and no program runs.
pub const NIGHT_TIMER_LENGTH_SECS: u64 = 2 * 60;

/// Extra lifetime of the one-shot marker beyond the program's window.
const TRIGGERED_MARKER_GRACE_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    /// Overwrite stored program definitions with the defaults at startup.
    pub force_default_programs: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            force_default_programs: false,
        }
    }
}

/// Polls the clock and executes light programs.
pub struct ProgramScheduler<S, C> {
    store: S,
    clock: C,
    programs: ProgramBook<S>,
    config: SchedulerConfig,
}

impl<S, C> ProgramScheduler<S, C>
where
    S: StateStore + Clone,
    C: Clock,
{
    pub fn new(store: S, clock: C, config: SchedulerConfig) -> Self {
        Self {
            programs: ProgramBook::new(store.clone()),
            store,
            clock,
            config,
        }
    }

    #[must_use]
    pub fn programs(&self) -> &ProgramBook<S> {
        &self.programs
    }

    /// Seed missing program definitions and enabled flags.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be read or written.
    pub async fn set_default_programs(&self) -> Result<(), LightControlError> {
        for (time_of_day, period) in CANONICAL_PROGRAMS {
            let key = keys::program(time_of_day, period);
            if self.config.force_default_programs || !self.store.exists(&key).await? {
                let program = LightProgram::default_for(time_of_day, period);
                self.store.set(&key, &program.settings.dump()).await?;
                tracing::info!(%program, "default program written");
            }

            let enabled = keys::program_enabled(time_of_day, period);
            if !self.store.exists(&enabled).await? {
                self.store.set(&enabled, keys::encode_bool(true)).await?;
            }
        }
        Ok(())
    }

    /// Store the next window of every program.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be read or written.
    pub async fn refresh_program_timestamps(
        &self,
        now: LocalTimestamp,
    ) -> Result<(), LightControlError> {
        for (time_of_day, period) in CANONICAL_PROGRAMS {
            let program = self.programs.program(time_of_day, period).await?;
            let (start, end) = program.window(now, true);
            self.store
                .set(&keys::program_next_start(time_of_day, period), &to_iso(start))
                .await?;
            self.store
                .set(&keys::program_next_end(time_of_day, period), &to_iso(end))
                .await?;
        }
        Ok(())
    }

    /// Store the auto-off timer length for the time of day and return it in seconds.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be read or written.
    pub async fn set_default_timer_length(
        &self,
        now: LocalTimestamp,
    ) -> Result<u64, LightControlError> {
        let length = if self.programs.is_day(now).await? {
            DAY_TIMER_LENGTH_SECS
        } else {
            NIGHT_TIMER_LENGTH_SECS
        };
        self.store
            .set(keys::TIMER_LENGTH, &length.to_string())
            .await?;
        Ok(length)
    }

    /// Execute the running `program`.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be read or written.
    #[tracing::instrument(skip_all, fields(program = %program.name()))]
    pub async fn execute_program(
        &self,
        now: LocalTimestamp,
        program: &LightProgram,
    ) -> Result<(), LightControlError> {
        if !self.programs.is_enabled(program).await? {
            tracing::debug!("program disabled");
            return Ok(());
        }

        let color = if self.programs.is_night(now).await? {
            Color::red()
        } else {
            Color::White
        };
        self.store.set(keys::DEFAULT_COLOR, color.as_str()).await?;
        if let Some(brightness) = program.settings.brightness {
            self.store
                .set(keys::DEFAULT_BRIGHTNESS, &brightness.to_string())
                .await?;
        }

        match program.time_of_day {
            TimeOfDay::Morning => self.trigger_morning(program).await,
            TimeOfDay::Evening => self.ramp_evening(now, program).await,
        }
    }

    /// Arm a wake-up timer for every group, once per window.
    async fn trigger_morning(&self, program: &LightProgram) -> Result<(), LightControlError> {
        let key = keys::program_triggered(program.time_of_day, program.period);
        let marker = serde_json::json!({
            "duration": program.settings.duration,
            "start_at": program.settings.start_at.format("%H:%M").to_string(),
        })
        .to_string();

        if self.store.get(&key).await?.as_deref() == Some(marker.as_str()) {
            tracing::trace!("morning program already triggered");
            return Ok(());
        }

        let duration = Duration::from_secs(u64::from(program.settings.duration));
        let start = TimerStart {
            target: GroupTarget::All,
            duration: Some(duration),
            force: true,
        };
        self.store
            .publish(channels::TIMER, &start.to_payload())
            .await?;
        self.store
            .set_with_expiry(
                &key,
                &marker,
                duration + Duration::from_secs(TRIGGERED_MARKER_GRACE_SECS),
            )
            .await?;
        tracing::info!(?duration, "morning program triggered");
        Ok(())
    }

    /// Dim linearly towards zero over the window.
    async fn ramp_evening(
        &self,
        now: LocalTimestamp,
        program: &LightProgram,
    ) -> Result<(), LightControlError> {
        let Some(done) = program.percent_done(now) else {
            tracing::warn!(%now, "evening program no longer running, cycle skipped");
            return Ok(());
        };

        let level = ramp_level(done);
        self.store
            .set(keys::DEFAULT_BRIGHTNESS, &level.to_string())
            .await?;

        let sync = Command::new(CommandKind::ProgramSync, GroupTarget::All, Source::Program);
        self.store
            .publish(channels::CONTROL, &sync.to_payload())
            .await?;
        tracing::debug!(level, done, "evening ramp");
        Ok(())
    }

    /// One scheduling pass at `now`.
    ///
    /// # Errors
    ///
    /// Returns a store error if a key cannot be read or written.
    pub async fn run_cycle(&self, now: LocalTimestamp) -> Result<(), LightControlError> {
        self.refresh_program_timestamps(now).await?;
        let length = self.set_default_timer_length(now).await?;

        if let Some(program) = self.programs.get_running_program(now).await? {
            return self.execute_program(now, &program).await;
        }

        let (color, brightness) = if length == DAY_TIMER_LENGTH_SECS {
            (Color::White, Brightness::FULL)
        } else {
            (Color::red(), Brightness::OFF)
        };
        self.store.set(keys::DEFAULT_COLOR, color.as_str()).await?;
        self.store
            .set(keys::DEFAULT_BRIGHTNESS, &brightness.to_string())
            .await?;
        Ok(())
    }

    /// Seed defaults, then poll forever.
    ///
    /// A failing cycle is logged and the next poll retries.
    pub async fn run(&self) {
        if let Err(err) = self.set_default_programs().await {
            tracing::error!(%err, "failed to seed default programs");
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(poll_interval = ?self.config.poll_interval, "program scheduler started");
        loop {
            ticker.tick().await;
            let now = self.clock.now();
            if let Err(err) = self.run_cycle(now).await {
                tracing::warn!(%err, %now, "scheduler cycle failed");
            }
        }
    }
}

/// Brightness for an evening ramp that is `done` of the way through.
#[allow(clippy::cast_possible_truncation)]
fn ramp_level(done: f64) -> i64 {
    ((1.0 - done.clamp(0.0, 1.0)) * 100.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryStateStore;
    use chrono::NaiveDate;
    use lightcontrol_domain::program::Period;
    use std::sync::Arc;

    struct FixedClock(LocalTimestamp);

    impl Clock for FixedClock {
        fn now(&self) -> LocalTimestamp {
            self.0
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> LocalTimestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn scheduler(
        now: LocalTimestamp,
    ) -> (
        Arc<InMemoryStateStore>,
        ProgramScheduler<Arc<InMemoryStateStore>, FixedClock>,
    ) {
        let store = Arc::new(InMemoryStateStore::new());
        let scheduler = ProgramScheduler::new(
            Arc::clone(&store),
            FixedClock(now),
            SchedulerConfig::default(),
        );
        (store, scheduler)
    }

    async fn get(store: &InMemoryStateStore, key: &str) -> Option<String> {
        store.get(key).await.unwrap()
    }

    #[tokio::test]
    async fn should_seed_all_programs_and_enable_them() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 12, 0));

        scheduler.set_default_programs().await.unwrap();

        for (time_of_day, period) in CANONICAL_PROGRAMS {
            assert!(store.exists(&keys::program(time_of_day, period)).await.unwrap());
            assert_eq!(
                get(&store, &keys::program_enabled(time_of_day, period)).await.as_deref(),
                Some("true")
            );
        }
    }

    #[tokio::test]
    async fn should_keep_stored_programs_unless_forced() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 12, 0));
        let key = keys::program(TimeOfDay::Morning, Period::Weekday);
        let custom = r#"{"start_at":"06:00","duration":600}"#;
        store.set(&key, custom).await.unwrap();
        store
            .set(&keys::program_enabled(TimeOfDay::Morning, Period::Weekday), "false")
            .await
            .unwrap();

        scheduler.set_default_programs().await.unwrap();

        assert_eq!(get(&store, &key).await.as_deref(), Some(custom));
        assert_eq!(
            get(&store, &keys::program_enabled(TimeOfDay::Morning, Period::Weekday))
                .await
                .as_deref(),
            Some("false")
        );
    }

    #[tokio::test]
    async fn should_overwrite_stored_programs_when_forced() {
        let store = Arc::new(InMemoryStateStore::new());
        let key = keys::program(TimeOfDay::Morning, Period::Weekday);
        store
            .set(&key, r#"{"start_at":"06:00","duration":600}"#)
            .await
            .unwrap();
        let scheduler = ProgramScheduler::new(
            Arc::clone(&store),
            FixedClock(at(2016, 3, 30, 12, 0)),
            SchedulerConfig {
                force_default_programs: true,
                ..SchedulerConfig::default()
            },
        );

        scheduler.set_default_programs().await.unwrap();

        let stored = get(&store, &key).await.unwrap();
        assert!(stored.contains("08:15"));
    }

    #[tokio::test]
    async fn should_refresh_next_window_timestamps() {
        let (store, scheduler) = scheduler(at(2016, 3, 28, 9, 34));

        scheduler
            .refresh_program_timestamps(at(2016, 3, 28, 9, 34))
            .await
            .unwrap();

        assert_eq!(
            get(&store, &keys::program_next_start(TimeOfDay::Morning, Period::Weekday))
                .await
                .as_deref(),
            Some("2016-03-29T08:15:00")
        );
        assert_eq!(
            get(&store, &keys::program_next_end(TimeOfDay::Morning, Period::Weekday))
                .await
                .as_deref(),
            Some("2016-03-29T09:15:00")
        );
        assert_eq!(
            get(&store, &keys::program_next_start(TimeOfDay::Morning, Period::Weekend))
                .await
                .as_deref(),
            Some("2016-04-02T09:30:00")
        );
    }

    #[tokio::test]
    async fn should_pick_timer_length_by_day_and_night() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 12, 0));

        let day = scheduler
            .set_default_timer_length(at(2016, 3, 30, 12, 0))
            .await
            .unwrap();
        assert_eq!(day, 900);
        assert_eq!(get(&store, keys::TIMER_LENGTH).await.as_deref(), Some("900"));

        let night = scheduler
            .set_default_timer_length(at(2016, 3, 30, 2, 0))
            .await
            .unwrap();
        assert_eq!(night, 120);
    }

    #[tokio::test]
    async fn should_push_day_defaults_when_no_program_runs() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 12, 0));

        scheduler.run_cycle(at(2016, 3, 30, 12, 0)).await.unwrap();

        assert_eq!(get(&store, keys::DEFAULT_COLOR).await.as_deref(), Some("white"));
        assert_eq!(get(&store, keys::DEFAULT_BRIGHTNESS).await.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn should_push_night_defaults_when_no_program_runs() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 3, 0));

        scheduler.run_cycle(at(2016, 3, 30, 3, 0)).await.unwrap();

        assert_eq!(get(&store, keys::DEFAULT_COLOR).await.as_deref(), Some("red"));
        assert_eq!(get(&store, keys::DEFAULT_BRIGHTNESS).await.as_deref(), Some("0"));
        assert_eq!(get(&store, keys::TIMER_LENGTH).await.as_deref(), Some("120"));
    }

    #[tokio::test]
    async fn should_trigger_morning_program_only_once() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 8, 30));
        scheduler.set_default_programs().await.unwrap();
        let mut timers = store.subscribe(channels::TIMER).await.unwrap();

        scheduler.run_cycle(at(2016, 3, 30, 8, 30)).await.unwrap();
        scheduler.run_cycle(at(2016, 3, 30, 8, 31)).await.unwrap();

        let start = TimerStart::decode(&timers.try_recv().unwrap(), 4).unwrap();
        assert_eq!(start.target, GroupTarget::All);
        assert_eq!(start.duration, Some(Duration::from_secs(3600)));
        assert!(start.force);
        assert_eq!(timers.try_recv(), None);
        assert_eq!(get(&store, keys::DEFAULT_BRIGHTNESS).await.as_deref(), Some("100"));
        assert_eq!(get(&store, keys::DEFAULT_COLOR).await.as_deref(), Some("white"));
    }

    #[tokio::test]
    async fn should_retrigger_morning_program_when_definition_changes() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 8, 30));
        scheduler.set_default_programs().await.unwrap();
        let mut timers = store.subscribe(channels::TIMER).await.unwrap();

        scheduler.run_cycle(at(2016, 3, 30, 8, 30)).await.unwrap();
        store
            .set(
                &keys::program(TimeOfDay::Morning, Period::Weekday),
                r#"{"start_at":"08:15","duration":7200,"brightness":80}"#,
            )
            .await
            .unwrap();
        scheduler.run_cycle(at(2016, 3, 30, 8, 31)).await.unwrap();

        assert!(timers.try_recv().is_some());
        let second = TimerStart::decode(&timers.try_recv().unwrap(), 4).unwrap();
        assert_eq!(second.duration, Some(Duration::from_secs(7200)));
    }

    #[tokio::test]
    async fn should_skip_disabled_program() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 8, 30));
        scheduler.set_default_programs().await.unwrap();
        store
            .set(&keys::program_enabled(TimeOfDay::Morning, Period::Weekday), "false")
            .await
            .unwrap();
        let mut timers = store.subscribe(channels::TIMER).await.unwrap();

        scheduler.run_cycle(at(2016, 3, 30, 8, 30)).await.unwrap();

        assert_eq!(timers.try_recv(), None);
        assert_eq!(get(&store, keys::DEFAULT_COLOR).await, None);
    }

    #[tokio::test]
    async fn should_refresh_timer_length_while_program_runs() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 8, 14));
        scheduler.set_default_programs().await.unwrap();
        store
            .set(&keys::program_enabled(TimeOfDay::Morning, Period::Weekday), "false")
            .await
            .unwrap();

        scheduler.run_cycle(at(2016, 3, 30, 8, 14)).await.unwrap();
        assert_eq!(get(&store, keys::TIMER_LENGTH).await.as_deref(), Some("120"));

        scheduler.run_cycle(at(2016, 3, 30, 8, 30)).await.unwrap();
        assert_eq!(get(&store, keys::TIMER_LENGTH).await.as_deref(), Some("900"));
    }

    #[tokio::test]
    async fn should_ramp_evening_brightness_and_request_program_sync() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 22, 45));
        scheduler.set_default_programs().await.unwrap();
        let mut control = store.subscribe(channels::CONTROL).await.unwrap();

        scheduler.run_cycle(at(2016, 3, 30, 22, 45)).await.unwrap();

        assert_eq!(get(&store, keys::DEFAULT_BRIGHTNESS).await.as_deref(), Some("50"));
        let sync = Command::decode(&control.try_recv().unwrap(), 4).unwrap();
        assert_eq!(sync.kind, CommandKind::ProgramSync);
        assert_eq!(sync.target, GroupTarget::All);
        assert_eq!(sync.source, Source::Program);
    }

    #[tokio::test]
    async fn should_skip_evening_cycle_when_window_already_passed() {
        let (store, scheduler) = scheduler(at(2016, 3, 30, 23, 30));
        scheduler.set_default_programs().await.unwrap();
        let mut control = store.subscribe(channels::CONTROL).await.unwrap();
        let program = LightProgram::default_for(TimeOfDay::Evening, Period::Weekday);

        scheduler
            .execute_program(at(2016, 3, 30, 23, 30), &program)
            .await
            .unwrap();

        assert_eq!(control.try_recv(), None);
        assert_eq!(get(&store, keys::DEFAULT_BRIGHTNESS).await, None);
    }

    #[test]
    fn should_ramp_linearly_to_zero() {
        assert_eq!(ramp_level(0.0), 100);
        assert_eq!(ramp_level(0.318), 68);
        assert_eq!(ramp_level(1.0), 0);
    }
}
